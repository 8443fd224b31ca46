//! Streaming XML file splitter
//!
//! Splits a large document into parts of at most `records_per_file` elements named by a
//! split tag. Every part repeats the ancestor tags of the split element, so each part is
//! a well-formed document with the original nesting:
//!
//! ```text
//! <Catalog><Items><Item/>x5000</Items></Catalog>
//!   -> catalog_part1.xml  <Catalog><Items><Item/>x2000</Items></Catalog>
//!   -> catalog_part2.xml  <Catalog><Items><Item/>x2000</Items></Catalog>
//!   -> catalog_part3.xml  <Catalog><Items><Item/>x1000</Items></Catalog>
//! ```
//!
//! The input is read as a stream; only one split element is held in memory at a time.

use crate::domain::{EdiError, Result};
use quick_xml::events::Event;
use quick_xml::{Reader, Writer};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Ancestor element names of the first `split_tag` element, outermost first
///
/// Returns `None` when the tag never occurs or occurs as the document root.
pub fn root_hierarchy(path: &Path, split_tag: &str) -> Result<Option<Vec<String>>> {
    let mut reader = open_reader(path)?;
    let mut buf = Vec::new();
    let mut stack: Vec<String> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = tag_name(e.name().as_ref());
                if name == split_tag {
                    return Ok((!stack.is_empty()).then_some(stack));
                }
                stack.push(name);
            }
            Event::Empty(e) => {
                if tag_name(e.name().as_ref()) == split_tag {
                    return Ok((!stack.is_empty()).then_some(stack));
                }
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
        buf.clear();
    }
}

/// Number of `split_tag` elements in the document
pub fn count_elements(path: &Path, split_tag: &str) -> Result<usize> {
    let mut reader = open_reader(path)?;
    let mut buf = Vec::new();
    let mut count = 0;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::End(e) if tag_name(e.name().as_ref()) == split_tag => count += 1,
            Event::Empty(e) if tag_name(e.name().as_ref()) == split_tag => count += 1,
            Event::Eof => return Ok(count),
            _ => {}
        }
        buf.clear();
    }
}

/// Splits `path` into parts written to `output_dir`
///
/// Parts are named `<stem>_part<N>.xml`, numbered from 1. Returns the part paths in
/// order.
///
/// # Errors
///
/// Returns a configuration error when `split_tag` has no ancestor in the document or
/// `records_per_file` is zero.
pub fn split_file(
    path: &Path,
    split_tag: &str,
    records_per_file: usize,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    if records_per_file == 0 {
        return Err(EdiError::Configuration(
            "Records per split file must be greater than zero".to_string(),
        ));
    }
    let ancestors = root_hierarchy(path, split_tag)?.ok_or_else(|| {
        EdiError::Configuration(format!(
            "Could not determine the hierarchy for '{split_tag}' in {}",
            path.display()
        ))
    })?;

    let total = count_elements(path, split_tag)?;
    tracing::info!(
        file = %path.display(),
        split_tag,
        records = total,
        parts = total.div_ceil(records_per_file),
        "Splitting file"
    );

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "split".to_string());

    let mut parts = PartWriter::new(output_dir, stem, ancestors);
    let mut reader = open_reader(path)?;
    let mut buf = Vec::new();
    let mut element: Option<Writer<Vec<u8>>> = None;
    let mut depth = 0usize;
    let mut written = 0usize;

    loop {
        let event = reader.read_event_into(&mut buf)?;
        if let Event::Eof = event {
            break;
        }

        match element.as_mut() {
            Some(capture) => {
                capture.write_event(&event)?;
                match &event {
                    Event::Start(_) => depth += 1,
                    Event::End(_) => depth -= 1,
                    _ => {}
                }
                if depth == 0 {
                    if let Some(done) = element.take() {
                        parts.append(written, records_per_file, &done.into_inner())?;
                        written += 1;
                    }
                }
            }
            None => match &event {
                Event::Start(e) if tag_name(e.name().as_ref()) == split_tag => {
                    let mut capture = Writer::new(Vec::new());
                    capture.write_event(&event)?;
                    element = Some(capture);
                    depth = 1;
                }
                Event::Empty(e) if tag_name(e.name().as_ref()) == split_tag => {
                    let mut capture = Writer::new(Vec::new());
                    capture.write_event(&event)?;
                    parts.append(written, records_per_file, &capture.into_inner())?;
                    written += 1;
                }
                _ => {}
            },
        }
        buf.clear();
    }

    let files = parts.close()?;
    tracing::info!(file = %path.display(), parts = files.len(), records = written, "File split");
    Ok(files)
}

/// Writes split elements into consecutive part files
struct PartWriter {
    output_dir: PathBuf,
    stem: String,
    ancestors: Vec<String>,
    current: Option<BufWriter<File>>,
    files: Vec<PathBuf>,
}

impl PartWriter {
    fn new(output_dir: &Path, stem: String, ancestors: Vec<String>) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            stem,
            ancestors,
            current: None,
            files: Vec::new(),
        }
    }

    /// Appends one element, rolling over to a new part every `cap` elements
    fn append(&mut self, index: usize, cap: usize, element: &[u8]) -> Result<()> {
        if index % cap == 0 || self.current.is_none() {
            self.roll()?;
        }
        if let Some(out) = self.current.as_mut() {
            out.write_all(element)?;
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    fn roll(&mut self) -> Result<()> {
        self.finish_current()?;

        let path = self
            .output_dir
            .join(format!("{}_part{}.xml", self.stem, self.files.len() + 1));
        let mut out = BufWriter::new(File::create(&path)?);
        out.write_all(b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n")?;
        for tag in &self.ancestors {
            out.write_all(format!("<{tag}>\n").as_bytes())?;
        }
        self.current = Some(out);
        self.files.push(path);
        Ok(())
    }

    fn finish_current(&mut self) -> Result<()> {
        if let Some(mut out) = self.current.take() {
            for tag in self.ancestors.iter().rev() {
                out.write_all(format!("</{tag}>\n").as_bytes())?;
            }
            out.flush()?;
        }
        Ok(())
    }

    fn close(mut self) -> Result<Vec<PathBuf>> {
        self.finish_current()?;
        Ok(self.files)
    }
}

fn open_reader(path: &Path) -> Result<Reader<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(Reader::from_reader(BufReader::new(file)))
}

fn tag_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::xml::decode;
    use crate::core::tree::{as_list, get_path};
    use tempfile::TempDir;

    fn catalog(items: usize) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Catalog>\n  <Header><Sender>ACME</Sender></Header>\n  <Items>\n");
        for i in 1..=items {
            xml.push_str(&format!(
                "    <Item code=\"C{i}\"><Name>Item &amp; {i}</Name><Qty>{i}</Qty></Item>\n"
            ));
        }
        xml.push_str("  </Items>\n</Catalog>\n");
        xml
    }

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_root_hierarchy() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "catalog.xml", &catalog(2));

        assert_eq!(
            root_hierarchy(&path, "Item").unwrap(),
            Some(vec!["Catalog".to_string(), "Items".to_string()])
        );
        assert_eq!(root_hierarchy(&path, "Missing").unwrap(), None);
        assert_eq!(root_hierarchy(&path, "Catalog").unwrap(), None);
    }

    #[test]
    fn test_count_elements() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "catalog.xml", &catalog(7));
        assert_eq!(count_elements(&path, "Item").unwrap(), 7);
        assert_eq!(count_elements(&path, "Name").unwrap(), 7);
    }

    #[test]
    fn test_split_exact_multiple_of_cap() {
        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let path = write(&dir, "catalog.xml", &catalog(6));

        let parts = split_file(&path, "Item", 3, out.path()).unwrap();
        assert_eq!(parts.len(), 2);
        assert!(parts[0].ends_with("catalog_part1.xml"));
        assert!(parts[1].ends_with("catalog_part2.xml"));

        for part in &parts {
            let xml = std::fs::read_to_string(part).unwrap();
            let tree = decode(&xml).unwrap();
            let items = get_path(&tree, "Catalog/Items/Item").unwrap();
            assert_eq!(as_list(items).len(), 3);
        }
    }

    #[test]
    fn test_split_remainder_goes_to_last_part() {
        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let path = write(&dir, "catalog.xml", &catalog(5));

        let parts = split_file(&path, "Item", 2, out.path()).unwrap();
        assert_eq!(parts.len(), 3);

        let last = decode(&std::fs::read_to_string(&parts[2]).unwrap()).unwrap();
        let item = get_path(&last, "Catalog/Items/Item").unwrap();
        assert_eq!(get_path(item, "@code").unwrap(), "C5");
        assert_eq!(get_path(item, "Name").unwrap(), "Item & 5");
    }

    #[test]
    fn test_split_handles_empty_elements() {
        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let path = write(&dir, "rows.xml", "<Rows><Row id=\"1\"/><Row id=\"2\"/><Row id=\"3\"/></Rows>");

        let parts = split_file(&path, "Row", 2, out.path()).unwrap();
        assert_eq!(parts.len(), 2);
        let first = decode(&std::fs::read_to_string(&parts[0]).unwrap()).unwrap();
        assert_eq!(as_list(get_path(&first, "Rows/Row").unwrap()).len(), 2);
    }

    #[test]
    fn test_split_unknown_tag_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let path = write(&dir, "catalog.xml", &catalog(2));

        let err = split_file(&path, "Product", 10, out.path()).unwrap_err();
        assert!(matches!(err, EdiError::Configuration(_)));
        assert!(err.to_string().contains("Could not determine the hierarchy for 'Product'"));
    }

    #[test]
    fn test_split_rejects_zero_cap() {
        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let path = write(&dir, "catalog.xml", &catalog(2));
        assert!(split_file(&path, "Item", 0, out.path()).is_err());
    }
}
