use romfs::builder::ImageBuilder;
use romfs::config::{DIR_LEN, HEADER_LEN};
use romfs::record::RecordHeader;
use romfs::{Djb2, PathHasher, RomFs, RomFsError, Whence};

const FILES: &[(&str, &str)] = &[
    ("docs/a.txt", "first file"),
    ("docs/b.txt", "second, slightly longer file"),
    ("bin/init", "\x7fELF\x02\x01\x01\0\0\0"),
    ("empty", ""),
    ("etc/motd", "welcome\n"),
];

fn image() -> Vec<u8> {
    let mut b = ImageBuilder::new();
    for (path, content) in FILES {
        b.add_file(path, content.as_bytes()).unwrap();
    }
    b.finish()
}

fn read_all(fs: &RomFs<'_>, path: &str) -> Vec<u8> {
    let fd = fs.open(path, 0, 0).unwrap();
    let size = fs.size(fd).unwrap();
    let mut out = vec![0u8; size];
    assert_eq!(fs.read(fd, &mut out).unwrap(), size);
    fs.close(fd).unwrap();
    out
}

fn list(fs: &RomFs<'_>, path: &str) -> Vec<String> {
    let dh = fs.opendir(path).unwrap();
    let mut names = Vec::new();
    let mut buf = [0u8; 64];
    while let Some(n) = fs.readdir(dh, &mut buf).unwrap() {
        assert_eq!(buf[n], 0, "name must be NUL-terminated");
        names.push(String::from_utf8(buf[..n].to_vec()).unwrap());
    }
    fs.closedir(dh).unwrap();
    names
}

#[test]
fn every_file_reads_back_exactly() {
    let img = image();
    let fs = RomFs::new(&img);
    for (path, content) in FILES {
        assert_eq!(read_all(&fs, path), content.as_bytes(), "{path}");
    }
}

#[test]
fn absent_paths_are_not_found() {
    let img = image();
    let fs = RomFs::new(&img);
    for path in ["nope", "docs/c.txt", "docs/a.txt.bak", "DOCS/a.txt"] {
        assert_eq!(fs.open(path, 0, 0).unwrap_err(), RomFsError::NotFound, "{path}");
    }
}

#[test]
fn seek_then_read_yields_the_window() {
    let img = image();
    let fs = RomFs::new(&img);
    let content = FILES[1].1.as_bytes();
    let fd = fs.open("docs/b.txt", 0, 0).unwrap();
    for k in 0..=content.len() {
        for n in [0, 1, 5, 64] {
            assert_eq!(fs.seek(fd, i64::try_from(k).unwrap(), Whence::Start).unwrap(), k);
            let mut buf = vec![0u8; n];
            let got = fs.read(fd, &mut buf).unwrap();
            assert_eq!(&buf[..got], &content[k..(k + n).min(content.len())]);
        }
    }
}

#[test]
fn seek_clamps_high_and_rejects_negative() {
    let img = image();
    let fs = RomFs::new(&img);
    let fd = fs.open("etc/motd", 0, 0).unwrap();
    assert_eq!(fs.seek(fd, 1000, Whence::Start).unwrap(), 8);
    assert_eq!(fs.read(fd, &mut [0; 4]).unwrap(), 0);
    assert_eq!(fs.seek(fd, -1, Whence::Start).unwrap_err(), RomFsError::InvalidOffset);
    assert_eq!(fs.seek(fd, -9, Whence::End).unwrap_err(), RomFsError::InvalidOffset);
    assert_eq!(fs.seek(fd, -8, Whence::End).unwrap(), 0);
}

#[test]
fn listing_follows_image_order() {
    let img = image();
    let fs = RomFs::new(&img);
    assert_eq!(list(&fs, "docs"), ["a.txt", "b.txt"]);
    assert_eq!(list(&fs, "/"), ["empty"]);
}

#[test]
fn closedir_leaves_no_residue_for_the_next_listing() {
    let img = image();
    let fs = RomFs::new(&img);
    assert_eq!(list(&fs, "docs"), ["a.txt", "b.txt"]);
    assert_eq!(list(&fs, "/etc/"), ["motd"]);
    assert_eq!(list(&fs, "bin"), ["init"]);
}

#[test]
fn opendir_without_matches_fails() {
    let img = image();
    let fs = RomFs::new(&img);
    assert_eq!(fs.opendir("docs/a.txt").unwrap_err(), RomFsError::NotADirectoryOrEmpty);
    assert_eq!(fs.opendir("usr").unwrap_err(), RomFsError::NotADirectoryOrEmpty);
    // a failed opendir does not hold the snapshot table
    assert_eq!(list(&fs, "docs").len(), 2);
}

#[test]
fn one_traversal_at_a_time() {
    let img = image();
    let fs = RomFs::new(&img);
    let dh = fs.opendir("docs").unwrap();
    assert_eq!(fs.opendir("etc").unwrap_err(), RomFsError::DirectoryBusy);

    // the open traversal is unaffected
    assert_eq!(fs.next_entry(dh).unwrap().unwrap().name(), b"a.txt");
    fs.closedir(dh).unwrap();
    assert_eq!(list(&fs, "etc"), ["motd"]);
}

#[test]
fn handcrafted_two_record_image() {
    let h = Djb2;
    let dir = h.hash_path("dir");
    let mut img = Vec::new();
    for (path, name, content) in [("dir/one", "one", &b"111"[..]), ("dir/two", "two", &b"2222"[..])] {
        let header = RecordHeader {
            file_hash: h.hash_path(path),
            body_len: u32::try_from(name.len() + 1 + content.len()).unwrap(),
            dir_hash: dir,
        };
        img.extend_from_slice(&header.to_bytes());
        img.extend_from_slice(name.as_bytes());
        img.push(0);
        img.extend_from_slice(content);
    }
    img.extend_from_slice(&[0; 8]);

    let fs = RomFs::new(&img);
    assert_eq!(read_all(&fs, "dir/one"), b"111");
    assert_eq!(read_all(&fs, "dir/two"), b"2222");
    assert_eq!(list(&fs, "dir"), ["one", "two"]);
}

#[test]
fn oversized_directory_is_rejected() {
    let mut b = ImageBuilder::new();
    for i in 0..DIR_LEN {
        b.add_file(&format!("big/{i}"), b"").unwrap();
    }
    b.add_file("small/only", b"").unwrap();
    let full = b.finish();
    let fs = RomFs::new(&full);
    assert_eq!(list(&fs, "big").len(), DIR_LEN);

    let mut b = ImageBuilder::new();
    for i in 0..=DIR_LEN {
        b.add_file(&format!("big/{i}"), b"").unwrap();
    }
    b.add_file("small/only", b"").unwrap();
    let over = b.finish();
    let fs = RomFs::new(&over);
    assert_eq!(
        fs.opendir("big").unwrap_err(),
        RomFsError::CapacityExceeded { capacity: DIR_LEN }
    );
    assert_eq!(list(&fs, "small"), ["only"]);
}

#[test]
fn truncated_images_are_corrupt() {
    let img = image();
    // cut inside the last record's body and drop the sentinel
    let cut = &img[..img.len() - HEADER_LEN - 2];
    let fs = RomFs::new(cut);
    assert!(matches!(
        fs.open("etc/motd", 0, 0).unwrap_err(),
        RomFsError::CorruptImage { .. }
    ));
    assert!(matches!(fs.opendir("etc").unwrap_err(), RomFsError::CorruptImage { .. }));
    // records before the damage are still reachable
    assert_eq!(read_all(&fs, "docs/a.txt"), b"first file");
    // listings walk the whole image, and a failed scan leaves the table free
    assert!(matches!(fs.opendir("docs").unwrap_err(), RomFsError::CorruptImage { .. }));
    assert!(matches!(fs.opendir("docs").unwrap_err(), RomFsError::CorruptImage { .. }));
}

#[test]
fn empty_image_is_corrupt_but_sentinel_only_is_empty() {
    let fs = RomFs::new(&[]);
    assert_eq!(fs.open("x", 0, 0).unwrap_err(), RomFsError::CorruptImage { offset: 0 });

    let sentinel = [0u8; HEADER_LEN];
    let fs = RomFs::new(&sentinel);
    assert_eq!(fs.open("x", 0, 0).unwrap_err(), RomFsError::NotFound);
    assert_eq!(fs.opendir("/").unwrap_err(), RomFsError::NotADirectoryOrEmpty);
}

#[test]
fn shared_between_threads() {
    use std::sync::Arc;
    use std::thread;

    let img: &'static [u8] = Box::leak(image().into_boxed_slice());
    let fs = Arc::new(RomFs::new(img));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let fs = Arc::clone(&fs);
            thread::spawn(move || {
                for _ in 0..100 {
                    assert_eq!(read_all(&fs, "etc/motd"), b"welcome\n");
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
}
