//! S2: init GPT + filesystem — `{bootsector:mbr, partition_scheme:gpt,
//! fs_loader:true, disk_size:4194304, fs_size:524288}`.

use pure64_core::builder::Builder;
use pure64_core::config::{Arch, Bootsector, ByteSize, Config, PartitionScheme};
use pure64_core::fs::Fs;
use pure64_core::gpt::Gpt;
use pure64_common::uuid;

const UUID_STAGE_TWO: &str = "daa1ab4e-7a2c-4404-8208-61a12c660382";
const UUID_STAGE_THREE: &str = "32cfd7f2-0e0a-4908-8d3b-16d7fb3a3c57";
const UUID_FILE_SYSTEM: &str = "f7439905-43da-4df0-b863-1f456e008b58";

struct Resources {
    _dir: tempfile::TempDir,
    root: std::path::PathBuf,
}

fn layout(mbr: &[u8], stage_two: &[u8], fs_loader: &[u8]) -> Resources {
    let dir = tempfile::tempdir().unwrap();
    let bootsectors = dir.path().join("x86_64").join("bootsectors");
    std::fs::create_dir_all(&bootsectors).unwrap();
    std::fs::write(bootsectors.join("mbr.sys"), mbr).unwrap();
    std::fs::write(dir.path().join("x86_64").join("bootable.sys"), stage_two).unwrap();
    std::fs::write(dir.path().join("x86_64").join("fs-loader.sys"), fs_loader).unwrap();

    Resources {
        root: dir.path().to_path_buf(),
        _dir: dir,
    }
}

#[test]
fn init_gpt_with_filesystem_loader_matches_the_expected_layout() {
    let mbr = vec![0x90u8; 512];
    let stage_two = vec![0xCCu8; 4096];
    let fs_loader = vec![0xEEu8; 2048];
    let resources = layout(&mbr, &stage_two, &fs_loader);

    let config = Config {
        arch: Arch::X86_64,
        bootsector: Bootsector::Mbr,
        partition_scheme: PartitionScheme::Gpt,
        fs_loader: true,
        disk_size: ByteSize(4 * 1024 * 1024),
        fs_size: Some(ByteSize(512 * 1024)),
        kernel_path: None,
        resource_path: Some(resources.root.clone()),
        partitions: Vec::new(),
    };

    let mut builder = Builder::new(config);
    let disk_path = resources._dir.path().join("disk.img");
    builder.create_disk(&disk_path).unwrap();

    let bytes = std::fs::read(&disk_path).unwrap();
    assert_eq!(bytes.len(), 4 * 1024 * 1024);
    assert_eq!(&bytes[512..520], b"EFI PART");

    let mut disk = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open(&disk_path)
        .unwrap();
    let gpt = Gpt::import(&mut disk).unwrap();

    let entry0 = gpt.get_entry(0).unwrap();
    assert_eq!(entry0.type_guid, uuid::parse(UUID_STAGE_TWO).unwrap());

    let entry1 = gpt.get_entry(1).unwrap();
    assert_eq!(entry1.type_guid, uuid::parse(UUID_STAGE_THREE).unwrap());
    assert_eq!(entry1.partition_name.to_string().unwrap(), "Pure64 FS Loader");

    let entry2 = gpt.get_entry(2).unwrap();
    assert_eq!(entry2.type_guid, uuid::parse(UUID_FILE_SYSTEM).unwrap());

    assert!(Gpt::verify_checksums(&mut disk).unwrap());

    let offset = gpt.get_partition_offset(2).unwrap();
    assert_eq!(&bytes[offset as usize..offset as usize + 8], &Fs::default().signature.to_le_bytes());

    let size = gpt.get_partition_size(2).unwrap();
    let mut partition = pure64_core::partition::PartitionStream::new(&mut disk, offset, size);
    let fs = Fs::import(&mut partition).unwrap();
    assert!(fs.open_dir("/boot").is_some());
}
