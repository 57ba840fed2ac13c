//! Pure64FS: the hierarchical filesystem this crate embeds in a
//! partition to carry a kernel and the files the second-stage loader
//! needs. Grounded in `bootable_fs`/`bootable_dir`/`bootable_file` and
//! their `*_export`/`*_import` stream layouts.

use crate::codec::{decode_u64, encode_u64};
use crate::error::{Error, Result};
use crate::io::{Read, Seek, Write};
use crate::path::Path;

/// Hex encoding of the string `"Pure64FS"`.
pub const SIGNATURE: u64 = 0x5346343665727550;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct File {
    pub name: String,
    pub data: Vec<u8>,
}

impl File {
    fn size(&self) -> u64 {
        16 + self.name.len() as u64 + self.data.len() as u64
    }

    fn export<T: Write + Seek>(&self, out: &mut T) -> Result<()> {
        encode_u64(self.name.len() as u64, out)?;
        encode_u64(self.data.len() as u64, out)?;
        out.write_all(self.name.as_bytes())?;
        out.write_all(&self.data)?;
        log::trace!("export file {:?} at {:#x}", self.name, out.stream_position()?);
        Ok(())
    }

    fn import<T: Read + Seek>(input: &mut T) -> Result<Self> {
        let offset = input.stream_position()?;
        let name_size = decode_u64(input)?;
        let data_size = decode_u64(input)?;
        let mut name = vec![0u8; name_size as usize];
        input.read_exact(&mut name)?;
        let mut data = vec![0u8; data_size as usize];
        input.read_exact(&mut data)?;
        let name = String::from_utf8_lossy(&name).into_owned();
        log::trace!("import file {name:?} at {offset:#x}");
        Ok(Self { name, data })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dir {
    pub name: String,
    pub subdirs: Vec<Dir>,
    pub files: Vec<File>,
}

impl Dir {
    fn size(&self) -> u64 {
        let mut size = 24 + self.name.len() as u64;
        for subdir in &self.subdirs {
            size += subdir.size();
        }
        for file in &self.files {
            size += file.size();
        }
        size
    }

    fn name_exists(&self, name: &str) -> bool {
        self.files.iter().any(|f| f.name == name) || self.subdirs.iter().any(|d| d.name == name)
    }

    fn add_file(&mut self, name: &str) -> Result<()> {
        if self.name_exists(name) {
            return Err(Error::already_exists(name.to_string()));
        }
        self.files.push(File {
            name: name.to_string(),
            data: Vec::new(),
        });
        Ok(())
    }

    fn add_subdir(&mut self, name: &str) -> Result<()> {
        if self.name_exists(name) {
            return Err(Error::already_exists(name.to_string()));
        }
        self.subdirs.push(Dir {
            name: name.to_string(),
            subdirs: Vec::new(),
            files: Vec::new(),
        });
        Ok(())
    }

    fn export<T: Write + Seek>(&self, out: &mut T) -> Result<()> {
        encode_u64(self.name.len() as u64, out)?;
        encode_u64(self.subdirs.len() as u64, out)?;
        encode_u64(self.files.len() as u64, out)?;
        out.write_all(self.name.as_bytes())?;
        log::trace!("export dir {:?} at {:#x}", self.name, out.stream_position()?);
        for subdir in &self.subdirs {
            subdir.export(out)?;
        }
        for file in &self.files {
            file.export(out)?;
        }
        Ok(())
    }

    /// Reads the whole subtree in one pass. Unlike the original's
    /// `bootable_dir_import` (which allocates `name`/`subdirs`/`files`
    /// up front and can leave a partially-populated `dir` behind if a
    /// later read fails), a `?` partway through simply drops everything
    /// built so far — there is no leaked or half-initialized state to
    /// clean up.
    fn import<T: Read + Seek>(input: &mut T) -> Result<Self> {
        let offset = input.stream_position()?;
        let name_size = decode_u64(input)?;
        let subdir_count = decode_u64(input)?;
        let file_count = decode_u64(input)?;

        let mut name = vec![0u8; name_size as usize];
        input.read_exact(&mut name)?;
        let name = String::from_utf8_lossy(&name).into_owned();
        log::trace!("import dir {name:?} at {offset:#x}");

        let mut subdirs = Vec::with_capacity(subdir_count as usize);
        for _ in 0..subdir_count {
            subdirs.push(Dir::import(input)?);
        }

        let mut files = Vec::with_capacity(file_count as usize);
        for _ in 0..file_count {
            files.push(File::import(input)?);
        }

        Ok(Self {
            name,
            subdirs,
            files,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Fs {
    pub signature: u64,
    pub size: u64,
    pub root: Dir,
}

impl Default for Fs {
    fn default() -> Self {
        Self {
            signature: SIGNATURE,
            size: 0,
            root: Dir::default(),
        }
    }
}

impl Fs {
    pub fn export<T: Write + Seek>(&mut self, out: &mut T) -> Result<()> {
        self.size = 16 + self.root.size();
        encode_u64(self.signature, out)?;
        encode_u64(self.size, out)?;
        self.root.export(out)
    }

    pub fn import<T: Read + Seek>(input: &mut T) -> Result<Self> {
        let signature = decode_u64(input)?;
        if signature != SIGNATURE {
            return Err(Error::invalid_argument(format!(
                "filesystem signature {signature:#x} != {SIGNATURE:#x}"
            )));
        }
        let size = decode_u64(input)?;
        let root = Dir::import(input)?;
        Ok(Self {
            signature,
            size,
            root,
        })
    }

    pub fn make_dir(&mut self, path: &str) -> Result<()> {
        let path = Path::parse(path);
        let components = path.components();
        if components.is_empty() {
            return Err(Error::invalid_argument("empty path"));
        }
        let parent = self.walk_to_parent(&components[..components.len() - 1])?;
        parent.add_subdir(&components[components.len() - 1])
    }

    pub fn make_file(&mut self, path: &str) -> Result<()> {
        let path = Path::parse(path);
        let components = path.components();
        if components.is_empty() {
            return Err(Error::invalid_argument("empty path"));
        }
        let parent = self.walk_to_parent(&components[..components.len() - 1])?;
        parent.add_file(&components[components.len() - 1])
    }

    /// Returns `None` rather than an error when any component of `path`
    /// is missing — a lookup miss is not a failure here, unlike
    /// `make_dir`/`make_file` walking a path that must exist.
    pub fn open_dir(&self, path: &str) -> Option<&Dir> {
        let path = Path::parse(path);
        self.find_dir(path.components())
    }

    pub fn open_dir_mut(&mut self, path: &str) -> Option<&mut Dir> {
        let path = Path::parse(path);
        self.find_dir_mut(path.components())
    }

    pub fn open_file(&self, path: &str) -> Option<&File> {
        let path = Path::parse(path);
        let components = path.components();
        if components.is_empty() {
            return None;
        }
        let parent = self.find_dir(&components[..components.len() - 1])?;
        let basename = &components[components.len() - 1];
        parent.files.iter().find(|f| &f.name == basename)
    }

    pub fn open_file_mut(&mut self, path: &str) -> Option<&mut File> {
        let path = Path::parse(path);
        let components = path.components();
        if components.is_empty() {
            return None;
        }
        let parent = self.find_dir_mut(&components[..components.len() - 1])?;
        let basename = &components[components.len() - 1];
        parent.files.iter_mut().find(|f| &f.name == basename)
    }

    fn find_dir(&self, names: &[String]) -> Option<&Dir> {
        let mut dir = &self.root;
        for name in names {
            dir = dir.subdirs.iter().find(|d| &d.name == name)?;
        }
        Some(dir)
    }

    fn find_dir_mut(&mut self, names: &[String]) -> Option<&mut Dir> {
        let mut dir = &mut self.root;
        for name in names {
            dir = dir.subdirs.iter_mut().find(|d| &d.name == name)?;
        }
        Some(dir)
    }

    fn walk_to_parent(&mut self, names: &[String]) -> Result<&mut Dir> {
        let mut dir = &mut self.root;
        for name in names {
            dir = dir
                .subdirs
                .iter_mut()
                .find(|d| &d.name == name)
                .ok_or_else(|| Error::not_found(name.clone()))?;
        }
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn make_dir_then_make_file_then_open_round_trips() {
        let mut fs = Fs::default();
        fs.make_dir("/boot").unwrap();
        fs.make_file("/boot/kernel.bin").unwrap();

        let file = fs.open_file_mut("/boot/kernel.bin").unwrap();
        file.data = b"hello kernel".to_vec();

        assert_eq!(fs.open_file("/boot/kernel.bin").unwrap().data, b"hello kernel");
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut fs = Fs::default();
        fs.make_dir("/boot").unwrap();
        assert!(fs.make_dir("/boot").is_err());
    }

    #[test]
    fn make_file_with_missing_parent_is_not_found() {
        let mut fs = Fs::default();
        assert!(fs.make_file("/missing/kernel.bin").is_err());
    }

    #[test]
    fn export_then_import_round_trips_the_tree() {
        let mut fs = Fs::default();
        fs.make_dir("/boot").unwrap();
        fs.make_file("/boot/kernel.bin").unwrap();
        fs.open_file_mut("/boot/kernel.bin").unwrap().data = vec![1, 2, 3, 4];

        let mut buf = Cursor::new(Vec::new());
        fs.export(&mut buf).unwrap();
        buf.set_position(0);

        let imported = Fs::import(&mut buf).unwrap();
        assert_eq!(imported.signature, SIGNATURE);
        assert_eq!(imported.open_file("/boot/kernel.bin").unwrap().data, vec![1, 2, 3, 4]);
    }

    #[test]
    fn import_rejects_bad_signature() {
        let mut buf = Cursor::new(Vec::new());
        encode_u64(0xdead_beef, &mut buf).unwrap();
        encode_u64(0, &mut buf).unwrap();
        buf.set_position(0);
        assert!(Fs::import(&mut buf).is_err());
    }
}
