//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "ediflow.toml")]
    pub output: String,

    /// Include example values and comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing Ediflow configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your servers and schemas", self.output);
                println!("  2. Create a .env file with your credentials:");
                println!("     - Set EDIFLOW_FTP_PASSWORD for remote servers");
                println!("     - Set EDIFLOW_RECEIPT_SECRET for the receipt endpoint");
                println!("  3. Validate configuration: ediflow validate-config");
                println!("  4. Discover directories: ediflow sync-directories --server <id>");
                println!("  5. Run export: ediflow export");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5)
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# Ediflow Configuration File
# XML EDI exchange between business records and file servers

[application]
log_level = "info"
dry_run = false

[store]
records_path = "data/records.json"
state_path = "data/edi_state.json"

[processing]
split_records_per_file = 2000
log_retention_days = 13
claim_lease_seconds = 600

[logging]
local_enabled = true
local_path = "logs"
local_rotation = "daily"

[http]
bind_address = "127.0.0.1:8069"
route = "/edi/receipt"

[[servers]]
id = "local"
protocol = "local"
root = "data/exchange"
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# Ediflow Configuration File
# XML EDI exchange between business records and file servers
#
# This file contains all configuration options with examples and explanations.
# Values of the form ${NAME} are read from the environment (or a .env file).

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# Dry run mode (count records, create no transactions)
dry_run = false

# ============================================================================
# Stores
# ============================================================================
[store]
# JSON snapshot of business records and their model descriptors
records_path = "data/records.json"

# JSON snapshot of transactions, attachments, log books and directories
state_path = "data/edi_state.json"

# ============================================================================
# Processing
# ============================================================================
[processing]
# Elements per part when a directory splits large files
split_records_per_file = 2000

# Log books older than this are removed by `ediflow purge-logs`
log_retention_days = 13

# A claimed transaction is skipped by other workers for this long
claim_lease_seconds = 600

# Maximum sub-schema nesting
max_schema_depth = 8

# Scratch directory for downloads and split parts (default: system temp)
# scratch_dir = "/var/tmp/ediflow"

# ============================================================================
# Logging Configuration
# ============================================================================
[logging]
# Enable local file logging (JSON lines)
local_enabled = true

# Local log directory
local_path = "/var/log/ediflow"

# Log rotation (daily or hourly)
local_rotation = "daily"

# ============================================================================
# Receipt Endpoint
# ============================================================================
[http]
bind_address = "0.0.0.0:8069"
route = "/edi/receipt"

# Partners allowed to post documents, matched against
# Header/Sender/Credential/Identity and SharedSecret
[[users]]
login = "partner@example.com"
shared_secret = "${EDIFLOW_RECEIPT_SECRET}"

# Schema used to import documents posted to a route
[[routes]]
route = "/edi/receipt"
schema = "order_import"

# ============================================================================
# File Servers
# ============================================================================
[[servers]]
id = "partner_ftp"
protocol = "ftp"   # local | ftp | sftp
host = "ftp.example.com"
port = 21
username = "edi"
password = "${EDIFLOW_FTP_PASSWORD}"

# Settings applied when `ediflow sync-directories` discovers these paths
[[servers.directories]]
path = "/in/orders"
download = true
search_schema_by_header = true
split_records = true
split_tag = "Order"

[[servers.directories]]
path = "/out/partners"
upload = true

# ============================================================================
# Mapping Schemas
# ============================================================================
# A multiple-record import delegates every item to the sub-schema of its first line
[[schemas]]
id = "order_import"
model = "sale.order"
direction = "incoming"
file_type = "multiple"          # single | multiple
xml_header = "Orders"

[[schemas.lines]]
xml_element = "Order"
field = "name"
sub_schema = "order_item_import"

[[schemas]]
id = "order_item_import"
model = "sale.order"
direction = "incoming"
main_table = false
search_keys = "Reference"
translate = true

[schemas.default_values]
state = "draft"

[[schemas.lines]]
xml_element = "Status"
field = "state"

[[schemas.lines]]
xml_element = "Reference"
field = "client_order_ref"
required = true

[[schemas.lines]]
xml_element = "Customer/Code"
field = "partner_id"
m2o_search_field = "ref"

[[schemas.lines]]
xml_element = "Lines/Line"
field = "order_line"
sub_schema = "order_line_import"

[[schemas]]
id = "order_line_import"
model = "sale.order.line"
direction = "incoming"
main_table = false

[[schemas.lines]]
xml_element = "Sku"
field = "product_id"
m2o_search_field = "default_code"

[[schemas.lines]]
xml_element = "Quantity"
field = "product_uom_qty"

[[schemas]]
id = "partner_export"
model = "res.partner"
direction = "outgoing"
file_type = "multiple"
xml_header = "Partners"
multiple_records_element = "Partner"
additional_filter = "[('customer', '=', True)]"
export_destination = { server = "partner_ftp", directory = "/out/partners" }

[[schemas.lines]]
xml_element = "Name"
field = "name"
char_length = 64

[[schemas.lines]]
xml_element = "Code"
field = "ref"

# Value substitutions applied to schemas with translate = true
[[translations]]
schema = "order_item_import"
xml_element = "Status"
xml_value = "NEW"
value = "draft"
"#
        .to_string()
    }
}
