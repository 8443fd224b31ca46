//! Schema registry
//!
//! Resolves the configured mapping schemas against the record store's model metadata
//! and validates the sub-schema graph once, up front. Engines only ever see resolved
//! [`SchemaTable`]s.

use crate::adapters::store::RecordStore;
use crate::config::{EdiConfig, RouteConfig, SchemaConfig};
use crate::domain::field::{FieldKind, ModelDescriptor};
use crate::domain::schema::{SchemaLine, SchemaTable, TranslationEntry};
use crate::domain::transaction::Direction;
use crate::domain::{EdiError, Result, SchemaId};
use std::collections::{BTreeMap, HashMap};

/// Product variant model; its schemas are exported on demand only
pub const CATALOG_MODEL: &str = "product.product";

/// Resolved schemas, translations and receipt routes
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: BTreeMap<SchemaId, SchemaTable>,
    order: Vec<SchemaId>,
    translations: HashMap<(SchemaId, String, String), String>,
    routes: Vec<RouteConfig>,
}

impl SchemaRegistry {
    /// Builds the registry from a validated configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a schema names an unknown model or field,
    /// references a missing sub-schema, lacks a sub-schema on a to-many line, or when the
    /// sub-schema graph is cyclic or nests deeper than `processing.max_schema_depth`.
    pub fn build(config: &EdiConfig, records: &dyn RecordStore) -> Result<Self> {
        Self::from_parts(
            &config.schemas,
            &config.translations,
            &config.routes,
            config.processing.max_schema_depth,
            records,
        )
    }

    pub fn from_parts(
        schemas: &[SchemaConfig],
        translations: &[TranslationEntry],
        routes: &[RouteConfig],
        max_depth: usize,
        records: &dyn RecordStore,
    ) -> Result<Self> {
        let mut resolved = BTreeMap::new();
        let mut order = Vec::with_capacity(schemas.len());

        for cfg in schemas {
            let model = records.model(&cfg.model)?;
            let table = resolve_schema(cfg, &model)?;
            records.ensure_processed_field(&cfg.model)?;
            order.push(table.id.clone());
            resolved.insert(table.id.clone(), table);
        }

        let registry = Self {
            schemas: resolved,
            order,
            translations: translations
                .iter()
                .map(|t| {
                    (
                        (t.schema.clone(), t.xml_element.clone(), t.xml_value.clone()),
                        t.value.clone(),
                    )
                })
                .collect(),
            routes: routes.to_vec(),
        };

        registry.validate_graph(max_depth)?;

        tracing::debug!(
            schemas = registry.order.len(),
            translations = registry.translations.len(),
            routes = registry.routes.len(),
            "Schema registry built"
        );
        Ok(registry)
    }

    /// Looks up a schema by id
    pub fn get(&self, id: &SchemaId) -> Result<&SchemaTable> {
        self.schemas
            .get(id)
            .ok_or_else(|| EdiError::Configuration(format!("Unknown schema '{id}'")))
    }

    /// All schemas in configuration order
    pub fn schemas(&self) -> impl Iterator<Item = &SchemaTable> {
        self.order.iter().filter_map(|id| self.schemas.get(id))
    }

    /// Nested schema of a relational line
    pub fn sub_schema(&self, line: &SchemaLine) -> Result<&SchemaTable> {
        let id = line.sub_schema.as_ref().ok_or_else(|| {
            EdiError::Configuration(format!(
                "Sub Config table is not setup for {}",
                line.xml_element
            ))
        })?;
        self.get(id)
    }

    /// Translated value of `raw` for an element of a schema
    pub fn translate(&self, schema: &SchemaId, xml_element: &str, raw: &str) -> Option<&str> {
        self.translations
            .get(&(schema.clone(), xml_element.to_string(), raw.to_string()))
            .map(String::as_str)
    }

    /// Main outgoing schemas picked up by the periodic export
    pub fn outgoing_main_schemas(&self) -> Vec<&SchemaTable> {
        self.schemas()
            .filter(|s| {
                s.direction == Direction::Outgoing && s.main_table && s.model != CATALOG_MODEL
            })
            .collect()
    }

    /// Incoming main schema whose header starts with the document root element
    pub fn find_by_header(&self, root_element: &str) -> Option<&SchemaTable> {
        self.schemas().find(|s| {
            s.direction == Direction::Incoming
                && s.main_table
                && s.root_element() == Some(root_element)
        })
    }

    /// Schema mapped to a receipt route
    ///
    /// Falls back to the first configured route when none matches.
    pub fn route(&self, route: &str) -> Result<&SchemaTable> {
        let mapping = self
            .routes
            .iter()
            .find(|r| r.route == route)
            .or_else(|| self.routes.first())
            .ok_or_else(|| {
                EdiError::Configuration(format!("No schema is mapped to route '{route}'"))
            })?;
        self.get(&mapping.schema)
    }

    fn validate_graph(&self, max_depth: usize) -> Result<()> {
        for id in &self.order {
            let mut path = Vec::new();
            self.walk(id, &mut path, max_depth)?;
        }
        Ok(())
    }

    fn walk(&self, id: &SchemaId, path: &mut Vec<SchemaId>, max_depth: usize) -> Result<()> {
        if path.contains(id) {
            let chain: Vec<&str> = path.iter().map(SchemaId::as_str).collect();
            return Err(EdiError::Configuration(format!(
                "Schema cycle detected: {} -> {}",
                chain.join(" -> "),
                id
            )));
        }
        if path.len() >= max_depth {
            return Err(EdiError::Configuration(format!(
                "Schema '{}' nests deeper than {} levels",
                path.first().unwrap_or(id),
                max_depth
            )));
        }

        let table = self.get(id)?;
        path.push(id.clone());
        for line in &table.lines {
            if let Some(sub) = &line.sub_schema {
                if !self.schemas.contains_key(sub) {
                    return Err(EdiError::Configuration(format!(
                        "Schema '{}' line '{}' references unknown sub-schema '{}'",
                        table.id, line.xml_element, sub
                    )));
                }
                self.walk(sub, path, max_depth)?;
            } else if needs_sub_schema(table.direction, line.field.kind) {
                return Err(EdiError::Configuration(format!(
                    "Sub Config table is not setup for {}",
                    line.xml_element
                )));
            }
        }
        path.pop();
        Ok(())
    }
}

fn needs_sub_schema(direction: Direction, kind: FieldKind) -> bool {
    match direction {
        Direction::Outgoing => kind.is_to_many(),
        Direction::Incoming => kind == FieldKind::One2many,
    }
}

fn resolve_schema(cfg: &SchemaConfig, model: &ModelDescriptor) -> Result<SchemaTable> {
    let lines = cfg
        .lines
        .iter()
        .map(|line| {
            let field = model.field(&line.field).cloned().ok_or_else(|| {
                EdiError::Configuration(format!(
                    "Schema '{}' maps '{}' to unknown field '{}' of model '{}'",
                    cfg.id, line.xml_element, line.field, cfg.model
                ))
            })?;
            Ok(SchemaLine {
                xml_element: line.xml_element.trim().to_string(),
                field,
                m2o_search_field: line.m2o_search_field.clone(),
                sub_schema: line.sub_schema.clone(),
                char_length: line.char_length,
                required: line.required,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(SchemaTable {
        id: cfg.id.clone(),
        model: cfg.model.clone(),
        direction: cfg.direction,
        file_type: cfg.file_type,
        main_table: cfg.main_table,
        xml_header: cfg.xml_header.clone(),
        multiple_records_element: cfg.multiple_records_element.clone(),
        default_values: cfg.default_values.clone(),
        search_keys: cfg.search_key_list(),
        additional_filter: cfg.additional_filter.clone(),
        translate: cfg.translate,
        partner: cfg.partner_id,
        company: cfg.company_id,
        inventory_location: cfg.inventory_location_id,
        export_destination: cfg.export_destination.clone(),
        lines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::store::MemoryRecordStore;
    use crate::config::SchemaLineConfig;
    use crate::domain::field::{FieldDescriptor, PROCESSED_FIELD};
    use crate::domain::record::Values;
    use crate::domain::schema::FileType;
    use std::str::FromStr;

    fn store() -> MemoryRecordStore {
        MemoryRecordStore::new()
            .with_model(
                ModelDescriptor::new("sale.order")
                    .with_field(FieldDescriptor::new("name", FieldKind::Char))
                    .with_field(
                        FieldDescriptor::new("order_line", FieldKind::One2many)
                            .with_relation("sale.order.line")
                            .with_inverse("order_id"),
                    ),
            )
            .with_model(
                ModelDescriptor::new("sale.order.line")
                    .with_field(FieldDescriptor::new("name", FieldKind::Char))
                    .with_field(
                        FieldDescriptor::new("order_id", FieldKind::Many2one)
                            .with_relation("sale.order"),
                    ),
            )
    }

    fn schema(id: &str, model: &str, direction: Direction) -> SchemaConfig {
        SchemaConfig {
            id: SchemaId::from_str(id).unwrap(),
            model: model.to_string(),
            direction,
            file_type: FileType::Single,
            main_table: true,
            xml_header: None,
            multiple_records_element: None,
            default_values: Values::new(),
            search_keys: None,
            additional_filter: None,
            translate: false,
            partner_id: None,
            company_id: None,
            inventory_location_id: None,
            export_destination: None,
            lines: vec![],
        }
    }

    fn line(xml: &str, field: &str, sub: Option<&str>) -> SchemaLineConfig {
        SchemaLineConfig {
            xml_element: xml.to_string(),
            field: field.to_string(),
            m2o_search_field: None,
            sub_schema: sub.map(|s| SchemaId::from_str(s).unwrap()),
            char_length: None,
            required: false,
        }
    }

    #[test]
    fn test_build_resolves_fields_and_provisions_flag() {
        let records = store();
        let mut order = schema("orders", "sale.order", Direction::Outgoing);
        order.xml_header = Some("Orders/Order".to_string());
        order.lines = vec![
            line("Name", "name", None),
            line("Lines/Line", "order_line", Some("lines")),
        ];
        let mut lines = schema("lines", "sale.order.line", Direction::Outgoing);
        lines.main_table = false;
        lines.lines = vec![line("Description", "name", None)];

        let registry = SchemaRegistry::from_parts(&[order, lines], &[], &[], 8, &records).unwrap();

        let table = registry.get(&SchemaId::from_str("orders").unwrap()).unwrap();
        assert_eq!(table.lines[1].field.kind, FieldKind::One2many);
        assert_eq!(registry.sub_schema(&table.lines[1]).unwrap().model, "sale.order.line");
        assert_eq!(registry.outgoing_main_schemas().len(), 1);
        assert!(records.model("sale.order").unwrap().field(PROCESSED_FIELD).is_some());
    }

    #[test]
    fn test_unknown_field_is_configuration_error() {
        let mut order = schema("orders", "sale.order", Direction::Incoming);
        order.lines = vec![line("Ref", "client_ref", None)];
        let err = SchemaRegistry::from_parts(&[order], &[], &[], 8, &store()).unwrap_err();
        assert!(matches!(err, EdiError::Configuration(msg) if msg.contains("client_ref")));
    }

    #[test]
    fn test_to_many_without_sub_schema_fails_fast() {
        let mut order = schema("orders", "sale.order", Direction::Outgoing);
        order.lines = vec![line("Lines/Line", "order_line", None)];
        let err = SchemaRegistry::from_parts(&[order], &[], &[], 8, &store()).unwrap_err();
        assert!(
            matches!(err, EdiError::Configuration(msg) if msg == "Sub Config table is not setup for Lines/Line")
        );
    }

    #[test]
    fn test_cycle_detected() {
        let mut a = schema("a", "sale.order", Direction::Outgoing);
        a.lines = vec![line("Lines", "order_line", Some("b"))];
        let mut b = schema("b", "sale.order", Direction::Outgoing);
        b.lines = vec![line("Lines", "order_line", Some("a"))];
        let err = SchemaRegistry::from_parts(&[a, b], &[], &[], 8, &store()).unwrap_err();
        assert!(matches!(err, EdiError::Configuration(msg) if msg.contains("cycle")));
    }

    #[test]
    fn test_depth_guard() {
        let mut a = schema("a", "sale.order", Direction::Outgoing);
        a.lines = vec![line("Lines", "order_line", Some("b"))];
        let b = schema("b", "sale.order.line", Direction::Outgoing);
        assert!(SchemaRegistry::from_parts(&[a.clone(), b.clone()], &[], &[], 2, &store()).is_ok());
        assert!(SchemaRegistry::from_parts(&[a, b], &[], &[], 1, &store()).is_err());
    }

    #[test]
    fn test_translate_and_routes() {
        let orders = schema("orders", "sale.order", Direction::Incoming);
        let entry = TranslationEntry {
            schema: orders.id.clone(),
            xml_element: "Status".to_string(),
            xml_value: "A".to_string(),
            value: "active".to_string(),
        };
        let route = RouteConfig {
            route: "/cxml/receive".to_string(),
            schema: orders.id.clone(),
        };
        let registry =
            SchemaRegistry::from_parts(&[orders.clone()], &[entry], &[route], 8, &store()).unwrap();

        assert_eq!(registry.translate(&orders.id, "Status", "A"), Some("active"));
        assert_eq!(registry.translate(&orders.id, "Status", "B"), None);
        assert_eq!(registry.route("/cxml/receive").unwrap().id, orders.id);
        assert_eq!(registry.route("/other").unwrap().id, orders.id);

        let empty = SchemaRegistry::from_parts(&[orders], &[], &[], 8, &store()).unwrap();
        assert!(matches!(empty.route("/x"), Err(EdiError::Configuration(_))));
    }

    #[test]
    fn test_find_by_header() {
        let mut orders = schema("orders", "sale.order", Direction::Incoming);
        orders.xml_header = Some("Orders/Order".to_string());
        let registry = SchemaRegistry::from_parts(&[orders], &[], &[], 8, &store()).unwrap();
        assert!(registry.find_by_header("Orders").is_some());
        assert!(registry.find_by_header("Invoices").is_none());
    }
}
