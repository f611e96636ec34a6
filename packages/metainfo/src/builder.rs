//! Builder for generating a torrent metainfo file from local files.
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use depot_bencode::{ben_bytes, ben_int, ben_map, BencodeMut};
use url::Url;
use walkdir::WalkDir;

use crate::bytes::string_to_latin1;
use crate::torrent::{
    Metainfo, ANNOUNCE_KEY, ANNOUNCE_LIST_KEY, COMMENT_KEY, CREATED_BY_KEY, CREATION_DATE_KEY, FILES_KEY, INFO_KEY,
    LENGTH_KEY, NAME_KEY, PATH_KEY, PIECES_KEY, PIECE_LENGTH_KEY,
};
use crate::{pieces, Error, DEFAULT_PIECE_LENGTH};

/// Builder for generating a torrent metainfo file for one or more local
/// files.
///
/// The result is always a seeder-mode [`Metainfo`]: the data the torrent
/// describes is, by construction, locally available in full.
///
/// ```rust,no_run
/// use depot_metainfo::MetainfoBuilder;
///
/// let metainfo = MetainfoBuilder::new()
///     .set_main_tracker("http://localhost:6969/announce")
///     .unwrap()
///     .set_created_by("Depot")
///     .build_from_file("dists/dependency.tar.gz")
///     .unwrap();
/// ```
#[derive(Debug)]
pub struct MetainfoBuilder {
    piece_length: u64,
    main_tracker: Option<Url>,
    announce_tiers: Vec<Vec<Url>>,
    comment: Option<String>,
    created_by: Option<String>,
    creation_date: Option<i64>,
}

impl Default for MetainfoBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetainfoBuilder {
    #[must_use]
    pub fn new() -> MetainfoBuilder {
        MetainfoBuilder {
            piece_length: DEFAULT_PIECE_LENGTH,
            main_tracker: None,
            announce_tiers: Vec::new(),
            comment: None,
            created_by: None,
            creation_date: None,
        }
    }

    /// Sets the main tracker (`announce`) for the torrent.
    ///
    /// # Errors
    ///
    /// Will return [`Error::UnsupportedUri`] if the given tracker is not a
    /// valid URL.
    pub fn set_main_tracker(mut self, tracker_url: &str) -> Result<MetainfoBuilder, Error> {
        self.main_tracker = Some(parse_url(tracker_url)?);
        Ok(self)
    }

    /// Adds an announce tier (`announce-list` entry). Tiers are emitted in
    /// the order they are added; URIs keep their order within a tier.
    ///
    /// # Errors
    ///
    /// Will return [`Error::UnsupportedUri`] if any URI in the tier is not a
    /// valid URL.
    pub fn add_announce_tier<'a, I>(mut self, tier: I) -> Result<MetainfoBuilder, Error>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let urls = tier.into_iter().map(parse_url).collect::<Result<Vec<Url>, Error>>()?;
        self.announce_tiers.push(urls);
        Ok(self)
    }

    /// Sets a comment for the torrent file.
    #[must_use]
    pub fn set_comment(mut self, comment: &str) -> MetainfoBuilder {
        self.comment = Some(comment.to_owned());
        self
    }

    /// Sets the creator for the torrent file (`created by`).
    #[must_use]
    pub fn set_created_by(mut self, created_by: &str) -> MetainfoBuilder {
        self.created_by = Some(created_by.to_owned());
        self
    }

    /// Sets the creation date, in seconds since the Unix epoch.
    ///
    /// Defaults to the time the torrent is built.
    #[must_use]
    pub fn set_creation_date(mut self, secs_epoch: i64) -> MetainfoBuilder {
        self.creation_date = Some(secs_epoch);
        self
    }

    /// Sets the piece length in bytes. Defaults to
    /// [`DEFAULT_PIECE_LENGTH`] (512 KiB).
    #[must_use]
    pub fn set_piece_length(mut self, piece_length: u64) -> MetainfoBuilder {
        self.piece_length = piece_length;
        self
    }

    /// Builds a single-file torrent. `info.name` is the file's base name and
    /// `info.length` its size. This method blocks while pieces are hashed.
    ///
    /// # Errors
    ///
    /// Will return an error if the path does not point at a readable file
    /// or hashing fails.
    pub fn build_from_file<P: AsRef<Path>>(self, file_path: P) -> Result<Metainfo, Error> {
        let file_path = file_path.as_ref();

        let metadata = std::fs::metadata(file_path)?;
        if !metadata.is_file() {
            return Err(Error::malformed("did not find a single file at the file path"));
        }

        let name = file_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::malformed("file name is missing or not valid UTF-8"))?;
        let name = latin1_bytes(name, "file name")?;

        if self.piece_length == 0 {
            return Err(Error::malformed("piece length is not positive"));
        }
        let pieces = pieces::hash_pieces(&[file_path.to_path_buf()], self.piece_length)?;

        let length = i64::try_from(metadata.len()).map_err(|_| Error::malformed("file is too large"))?;

        let info = ben_map! {
            LENGTH_KEY => ben_int!(length),
            NAME_KEY => ben_bytes!(name),
            PIECE_LENGTH_KEY => ben_int!(to_i64(self.piece_length)?),
            PIECES_KEY => ben_bytes!(pieces)
        };

        let encoded = self.assemble(info)?;
        Metainfo::parse(encoded, true)
    }

    /// Builds a multi-file torrent from a directory. `info.name` is the
    /// directory's base name; every regular file below it is included, in
    /// deterministic sorted order, with its path relative to the directory.
    /// This method blocks while pieces are hashed.
    ///
    /// # Errors
    ///
    /// Will return an error if the directory cannot be walked, contains no
    /// files, or hashing fails.
    pub fn build_from_directory<P: AsRef<Path>>(self, dir_path: P) -> Result<Metainfo, Error> {
        let dir_path = dir_path.as_ref();

        let name = dir_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::malformed("directory name is missing or not valid UTF-8"))?;
        let name = latin1_bytes(name, "directory name")?;

        // Sorted traversal: the same directory always produces the same
        // file order, and therefore the same info-hash.
        let mut file_paths: Vec<PathBuf> = Vec::new();
        for entry in WalkDir::new(dir_path).sort_by_file_name() {
            let entry = entry.map_err(|err| Error::Io {
                source: err.into(),
            })?;
            if entry.file_type().is_file() {
                file_paths.push(entry.into_path());
            }
        }

        if file_paths.is_empty() {
            return Err(Error::malformed("found no files in the directory"));
        }

        if self.piece_length == 0 {
            return Err(Error::malformed("piece length is not positive"));
        }

        let mut file_entries = BencodeMut::new_list();
        {
            let entries = file_entries.list_mut().unwrap();
            for path in &file_paths {
                let length = i64::try_from(std::fs::metadata(path)?.len()).map_err(|_| Error::malformed("file is too large"))?;

                let mut components = BencodeMut::new_list();
                {
                    let components_list = components.list_mut().unwrap();
                    let relative = path.strip_prefix(dir_path).expect("walked paths start with the walk root");
                    for component in relative.iter() {
                        let component = component
                            .to_str()
                            .ok_or_else(|| Error::malformed("file path component is not valid UTF-8"))?;
                        components_list.push(ben_bytes!(latin1_bytes(component, "file path component")?));
                    }
                }

                entries.push(ben_map! {
                    LENGTH_KEY => ben_int!(length),
                    PATH_KEY => components
                });
            }
        }

        let pieces = pieces::hash_pieces(&file_paths, self.piece_length)?;

        let info = ben_map! {
            FILES_KEY => file_entries,
            NAME_KEY => ben_bytes!(name),
            PIECE_LENGTH_KEY => ben_int!(to_i64(self.piece_length)?),
            PIECES_KEY => ben_bytes!(pieces)
        };

        let encoded = self.assemble(info)?;
        Metainfo::parse(encoded, true)
    }

    /// Wraps the info dictionary with the root-level keys and encodes the
    /// whole metainfo canonically. Text fields are written as ISO-8859-1,
    /// matching how readers surface them.
    fn assemble(self, info: BencodeMut<'_>) -> Result<Vec<u8>, Error> {
        let mut root = BencodeMut::new_dict();
        {
            let root_dict = root.dict_mut().unwrap();

            if let Some(main_tracker) = &self.main_tracker {
                root_dict.insert(
                    ANNOUNCE_KEY.as_bytes().into(),
                    ben_bytes!(main_tracker.as_str().to_owned()),
                );
            }

            if !self.announce_tiers.is_empty() {
                let mut tiers = BencodeMut::new_list();
                {
                    let tiers_list = tiers.list_mut().unwrap();
                    for tier in &self.announce_tiers {
                        let mut tier_entry = BencodeMut::new_list();
                        {
                            let tier_list = tier_entry.list_mut().unwrap();
                            for url in tier {
                                tier_list.push(ben_bytes!(url.as_str().to_owned()));
                            }
                        }
                        tiers_list.push(tier_entry);
                    }
                }
                root_dict.insert(ANNOUNCE_LIST_KEY.as_bytes().into(), tiers);
            }

            if let Some(comment) = &self.comment {
                root_dict.insert(COMMENT_KEY.as_bytes().into(), ben_bytes!(latin1_bytes(comment, "comment")?));
            }

            if let Some(created_by) = &self.created_by {
                root_dict.insert(
                    CREATED_BY_KEY.as_bytes().into(),
                    ben_bytes!(latin1_bytes(created_by, "created by")?),
                );
            }

            let creation_date = self.creation_date.unwrap_or_else(now_secs_epoch);
            root_dict.insert(CREATION_DATE_KEY.as_bytes().into(), ben_int!(creation_date));

            root_dict.insert(INFO_KEY.as_bytes().into(), info);
        }

        Ok(root.encode())
    }
}

fn parse_url(raw: &str) -> Result<Url, Error> {
    Url::parse(raw).map_err(|source| Error::UnsupportedUri {
        uri: raw.to_owned(),
        source,
    })
}

/// Encodes a text field as ISO-8859-1 bytes, the interpretation readers
/// apply when surfacing it again.
fn latin1_bytes(text: &str, what: &str) -> Result<Vec<u8>, Error> {
    string_to_latin1(text).ok_or_else(|| Error::MalformedMetainfo {
        reason: format!("{what} is not representable in ISO-8859-1"),
    })
}

fn to_i64(value: u64) -> Result<i64, Error> {
    i64::try_from(value).map_err(|_| Error::malformed("value does not fit a bencode integer"))
}

fn now_secs_epoch() -> i64 {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("the system time should be after the unix epoch");
    i64::try_from(since_epoch.as_secs()).expect("the current time should fit an i64")
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::Path;

    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};

    use super::MetainfoBuilder;
    use crate::torrent::Metainfo;
    use crate::{Error, DEFAULT_PIECE_LENGTH};

    const TEST_ANNOUNCE: &str = "http://localhost:6969/announce";

    fn pseudo_random_bytes(seed: u64, len: usize) -> Vec<u8> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut bytes = vec![0u8; len];
        rng.fill_bytes(&mut bytes);
        bytes
    }

    fn write_file(path: &Path, content: &[u8]) {
        let mut file = std::fs::File::create(path).unwrap();
        file.write_all(content).unwrap();
    }

    #[test]
    fn it_should_build_a_single_file_torrent_with_the_default_piece_length() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("dependency.bin");
        write_file(&file_path, &pseudo_random_bytes(0, 1_234_567));

        let metainfo = MetainfoBuilder::new()
            .set_main_tracker(TEST_ANNOUNCE)
            .unwrap()
            .set_created_by("Test")
            .build_from_file(&file_path)
            .unwrap();

        assert_eq!(metainfo.name(), "dependency.bin");
        assert_eq!(metainfo.total_size(), 1_234_567);
        assert_eq!(metainfo.piece_length(), DEFAULT_PIECE_LENGTH);
        // ceil(1234567 / 524288) = 3 pieces of 20 bytes each.
        assert_eq!(metainfo.pieces().len(), 60);
        assert_eq!(metainfo.announce().unwrap().as_str(), TEST_ANNOUNCE);
        assert_eq!(metainfo.announce_tiers().len(), 1);
        assert_eq!(metainfo.created_by().unwrap(), "Test");
        assert!(!metainfo.is_multi_file());
        assert!(metainfo.is_seeder());
    }

    #[test]
    fn it_should_build_a_multi_file_torrent_in_sorted_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("bundle");
        std::fs::create_dir_all(root.join("sub")).unwrap();
        write_file(&root.join("zz.bin"), &pseudo_random_bytes(1, 600));
        write_file(&root.join("aa.bin"), &pseudo_random_bytes(2, 400));
        write_file(&root.join("sub").join("mid.bin"), &pseudo_random_bytes(3, 100));

        let metainfo = MetainfoBuilder::new()
            .set_main_tracker(TEST_ANNOUNCE)
            .unwrap()
            .set_piece_length(1024)
            .build_from_directory(&root)
            .unwrap();

        assert_eq!(metainfo.name(), "bundle");
        assert!(metainfo.is_multi_file());
        assert_eq!(metainfo.total_size(), 1100);

        let paths: Vec<_> = metainfo.files().iter().map(|file| file.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                Path::new("aa.bin").to_path_buf(),
                Path::new("sub").join("mid.bin"),
                Path::new("zz.bin").to_path_buf(),
            ]
        );
    }

    #[test]
    fn it_should_produce_the_same_info_hash_for_the_same_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("bundle");
        std::fs::create_dir_all(&root).unwrap();
        write_file(&root.join("a.bin"), &pseudo_random_bytes(4, 5000));
        write_file(&root.join("b.bin"), &pseudo_random_bytes(5, 5000));

        let build = || {
            MetainfoBuilder::new()
                .set_main_tracker(TEST_ANNOUNCE)
                .unwrap()
                .set_piece_length(2048)
                .set_creation_date(1_669_397_478)
                .build_from_directory(&root)
                .unwrap()
        };

        assert_eq!(build().info_hash(), build().info_hash());
    }

    #[test]
    fn it_should_round_trip_through_the_parser() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("artifact.bin");
        write_file(&file_path, &pseudo_random_bytes(6, 10_000));

        let built = MetainfoBuilder::new()
            .set_main_tracker(TEST_ANNOUNCE)
            .unwrap()
            .set_comment("round trip")
            .set_piece_length(4096)
            .build_from_file(&file_path)
            .unwrap();

        let reparsed = Metainfo::parse(built.encoded().to_vec(), false).unwrap();

        assert_eq!(built.info_hash(), reparsed.info_hash());
        assert_eq!(built.encoded(), reparsed.encoded());
        assert_eq!(reparsed.comment().unwrap(), "round trip");
    }

    #[test]
    fn it_should_emit_both_announce_and_announce_list_when_both_are_supplied() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("artifact.bin");
        write_file(&file_path, &pseudo_random_bytes(7, 100));

        let metainfo = MetainfoBuilder::new()
            .set_main_tracker(TEST_ANNOUNCE)
            .unwrap()
            .add_announce_tier(["http://backup.localhost:6969/announce"])
            .unwrap()
            .build_from_file(&file_path)
            .unwrap();

        assert!(metainfo.announce().is_some());
        assert_eq!(metainfo.announce_tiers().len(), 1);
        assert_eq!(
            metainfo.announce_tiers()[0][0].as_str(),
            "http://backup.localhost:6969/announce"
        );
    }

    #[test]
    fn it_should_build_a_trackerless_torrent_when_no_tracker_is_supplied() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("artifact.bin");
        write_file(&file_path, &pseudo_random_bytes(8, 100));

        let metainfo = MetainfoBuilder::new().build_from_file(&file_path).unwrap();

        assert!(metainfo.is_trackerless());
    }

    #[test]
    fn it_should_round_trip_latin1_text_fields_through_the_parser() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("artifact.bin");
        write_file(&file_path, &pseudo_random_bytes(10, 100));

        // "café" has a code point above ASCII but inside ISO-8859-1, so it
        // must come back unchanged from the byte-per-char reader.
        let metainfo = MetainfoBuilder::new()
            .set_comment("café release")
            .set_created_by("dépôt")
            .build_from_file(&file_path)
            .unwrap();

        let reparsed = Metainfo::parse(metainfo.encoded().to_vec(), false).unwrap();
        assert_eq!(reparsed.comment().unwrap(), "café release");
        assert_eq!(reparsed.created_by().unwrap(), "dépôt");
    }

    #[test]
    fn it_should_reject_text_fields_outside_iso_8859_1() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("artifact.bin");
        write_file(&file_path, &pseudo_random_bytes(11, 100));

        let result = MetainfoBuilder::new()
            .set_comment("\u{0100}")
            .build_from_file(&file_path);

        assert!(matches!(result.unwrap_err(), Error::MalformedMetainfo { .. }));
    }

    #[test]
    fn the_built_torrent_should_verify_against_the_data_it_was_built_from() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("artifact.bin");
        write_file(&file_path, &pseudo_random_bytes(9, 5000));

        let metainfo = MetainfoBuilder::new()
            .set_piece_length(1024)
            .build_from_file(&file_path)
            .unwrap();

        assert!(metainfo.verify_data(dir.path()).unwrap());

        // Flip one byte: the verification must notice.
        let mut corrupted = pseudo_random_bytes(9, 5000);
        corrupted[4321] ^= 0xFF;
        write_file(&file_path, &corrupted);

        assert!(!metainfo.verify_data(dir.path()).unwrap());
    }

    #[test]
    fn it_should_reject_an_invalid_tracker_url() {
        let result = MetainfoBuilder::new().set_main_tracker("not a tracker");

        assert!(matches!(result.unwrap_err(), Error::UnsupportedUri { .. }));
    }

    #[test]
    fn it_should_refuse_to_build_from_an_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("empty");
        std::fs::create_dir_all(&root).unwrap();

        let result = MetainfoBuilder::new().build_from_directory(&root);

        assert!(matches!(result.unwrap_err(), Error::MalformedMetainfo { .. }));
    }
}
