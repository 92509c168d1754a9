use crate::core::models::atoms::AtomSet;
use crate::core::models::mesh::Mesh;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// A text format that atom sets can be read from.
pub trait AtomFile {
    /// Per-file information that does not belong in the [`AtomSet`].
    type Metadata;

    type Error: Error + From<io::Error>;

    /// Parses an atom set from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if a line cannot be parsed or the reader fails.
    fn read_from(reader: &mut impl BufRead) -> Result<(AtomSet, Self::Metadata), Self::Error>;

    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<(AtomSet, Self::Metadata), Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }
}

/// A text format that meshes can be written to.
pub trait MeshFile {
    type Error: Error + From<io::Error>;

    /// Serializes `mesh` to `writer`.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_to(mesh: &Mesh, writer: &mut impl Write) -> Result<(), Self::Error>;

    fn write_to_path<P: AsRef<Path>>(mesh: &Mesh, path: P) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(mesh, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
