use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

type Supplier = Box<dyn FnOnce() -> io::Result<Box<dyn Read>>>;

enum Source {
    Bytes(Vec<u8>),
    File(PathBuf),
    Reader(Box<dyn Read>),
    Supplier(Supplier),
}

/// A named content stream to embed in a SIP.
///
/// The stream is opened only when the assembler processes the object and is
/// dropped before the `add` call that consumed it returns.
pub struct DigitalObject {
    reference_information: String,
    source: Source,
}

impl DigitalObject {
    pub fn from_bytes(reference_information: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            reference_information: reference_information.into(),
            source: Source::Bytes(bytes.into()),
        }
    }

    pub fn from_string(reference_information: impl Into<String>, content: impl Into<String>) -> Self {
        Self::from_bytes(reference_information, content.into().into_bytes())
    }

    /// Content read from `path` when the object is processed.
    pub fn from_file(reference_information: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Self {
            reference_information: reference_information.into(),
            source: Source::File(path.as_ref().to_path_buf()),
        }
    }

    pub fn from_reader(reference_information: impl Into<String>, reader: impl Read + 'static) -> Self {
        Self {
            reference_information: reference_information.into(),
            source: Source::Reader(Box::new(reader)),
        }
    }

    /// Content produced lazily by `supplier`.
    pub fn from_supplier<F, R>(reference_information: impl Into<String>, supplier: F) -> Self
    where
        F: FnOnce() -> io::Result<R> + 'static,
        R: Read + 'static,
    {
        Self {
            reference_information: reference_information.into(),
            source: Source::Supplier(Box::new(move || supplier().map(|r| Box::new(r) as Box<dyn Read>))),
        }
    }

    /// Name of the object inside the container, usually a relative path.
    pub fn reference_information(&self) -> &str {
        &self.reference_information
    }

    /// Open the content stream, consuming the object.
    pub fn open(self) -> io::Result<Box<dyn Read>> {
        match self.source {
            Source::Bytes(bytes) => Ok(Box::new(Cursor::new(bytes))),
            Source::File(path) => Ok(Box::new(BufReader::new(File::open(path)?))),
            Source::Reader(reader) => Ok(reader),
            Source::Supplier(supplier) => supplier(),
        }
    }
}

impl fmt::Debug for DigitalObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match &self.source {
            Source::Bytes(b) => format!("bytes({})", b.len()),
            Source::File(p) => format!("file({})", p.display()),
            Source::Reader(_) => "reader".to_string(),
            Source::Supplier(_) => "supplier".to_string(),
        };
        f.debug_struct("DigitalObject")
            .field("reference_information", &self.reference_information)
            .field("source", &source)
            .finish()
    }
}

/// Maps a domain object to the digital objects embedded for it.
///
/// Called exactly once per `add`. The returned objects are written in order.
pub trait DigitalObjectsExtraction<D> {
    fn extract(&self, domain_object: &D) -> io::Result<Vec<DigitalObject>>;
}

impl<D, F> DigitalObjectsExtraction<D> for F
where
    F: Fn(&D) -> io::Result<Vec<DigitalObject>>,
{
    fn extract(&self, domain_object: &D) -> io::Result<Vec<DigitalObject>> {
        self(domain_object)
    }
}

/// Extraction for metadata-only records.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDigitalObjects;

impl<D> DigitalObjectsExtraction<D> for NoDigitalObjects {
    fn extract(&self, _: &D) -> io::Result<Vec<DigitalObject>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    fn read_all(object: DigitalObject) -> Vec<u8> {
        let mut out = Vec::new();
        object.open().unwrap().read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn bytes_and_string_sources() {
        assert_eq!(read_all(DigitalObject::from_bytes("a", vec![1, 2, 3])), vec![1, 2, 3]);
        assert_eq!(read_all(DigitalObject::from_string("b", "hi")), b"hi");
    }

    #[test]
    fn file_source_opened_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("later.txt");
        let object = DigitalObject::from_file("later.txt", &path);
        std::fs::write(&path, b"written after construction").unwrap();
        assert_eq!(read_all(object), b"written after construction");
    }

    #[test]
    fn missing_file_fails_on_open() {
        let object = DigitalObject::from_file("nope", "/definitely/not/here.bin");
        assert_eq!(object.open().err().unwrap().kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn supplier_runs_only_on_open() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let object = DigitalObject::from_supplier("lazy", move || {
            counter.set(counter.get() + 1);
            Ok(Cursor::new(b"lazy".to_vec()))
        });
        assert_eq!(calls.get(), 0);
        assert_eq!(read_all(object), b"lazy");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn closure_extraction() {
        let extraction = |n: &usize| -> io::Result<Vec<DigitalObject>> {
            Ok((0..*n).map(|i| DigitalObject::from_string(format!("{i}.txt"), "x")).collect())
        };
        let objects = extraction.extract(&3).unwrap();
        let names: Vec<_> = objects.iter().map(|o| o.reference_information()).collect();
        assert_eq!(names, vec!["0.txt", "1.txt", "2.txt"]);
        assert!(NoDigitalObjects.extract(&3).unwrap().is_empty());
    }
}
