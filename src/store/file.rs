// Read side:
// every fetch re-reads its file
// no in-process caching
// writes only through write_snapshot

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::profile::UserProfile;
use crate::store::memory::StoreSnapshot;
use crate::store::popular::PopularPosts;
use crate::store::store::{CreatorRecord, FeedStore, PostProjection, PostRecord, StoreError};
use crate::types::identifiers::UserId;

const USERS_FILE: &str = "users.json";
const POSTS_FILE: &str = "posts.json";
const POPULAR_FILE: &str = "popular.json";

#[derive(Debug, Error)]
pub enum SnapshotWriteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Output directory already exists: {0}")]
    OutputExists(PathBuf),
    #[error("Duplicate user ID: {0}")]
    DuplicateUserId(String),
    #[error("Output path has no directory name: {0}")]
    InvalidOutputPath(PathBuf),
}

/// Store backed by a snapshot directory of JSON files.
#[derive(Debug, Clone)]
pub struct FileStore {
    pub root: PathBuf,
}

impl FileStore {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Write `snapshot` to `output_dir` and open it.
    ///
    /// The directory is staged next to its final location and renamed into
    /// place, so readers never observe a partial snapshot.
    pub fn write_snapshot(
        snapshot: &StoreSnapshot,
        output_dir: &Path,
    ) -> Result<FileStore, SnapshotWriteError> {
        if output_dir.exists() {
            return Err(SnapshotWriteError::OutputExists(output_dir.to_path_buf()));
        }

        let mut users = snapshot.users.clone();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        for pair in users.windows(2) {
            if pair[0].id == pair[1].id {
                return Err(SnapshotWriteError::DuplicateUserId(pair[0].id.to_string()));
            }
        }

        let temp_dir = staging_dir(output_dir, &users, snapshot)?;
        // Stale staging dir from a crashed previous write of this same snapshot
        if temp_dir.exists() {
            fs::remove_dir_all(&temp_dir)?;
        }
        fs::create_dir_all(&temp_dir)?;

        write_json(&temp_dir.join(USERS_FILE), &users)?;
        write_json(&temp_dir.join(POSTS_FILE), &snapshot.posts)?;
        if let Some(popular) = &snapshot.popular {
            write_json(&temp_dir.join(POPULAR_FILE), popular)?;
        }

        fs::rename(&temp_dir, output_dir)?;

        Ok(FileStore::open(output_dir))
    }

    fn read<T: DeserializeOwned>(&self, file: &str) -> Result<T, StoreError> {
        let path = self.root.join(file);
        let f = fs::File::open(&path)
            .map_err(|e| StoreError::Unavailable(format!("{}: {e}", path.display())))?;
        serde_json::from_reader(f)
            .map_err(|e| StoreError::Malformed(format!("{}: {e}", path.display())))
    }

    fn users(&self) -> Result<Vec<UserProfile>, StoreError> {
        self.read(USERS_FILE)
    }

    fn posts(&self) -> Result<Vec<PostRecord>, StoreError> {
        self.read(POSTS_FILE)
    }
}

/// `<name>.tmp.<hash>` next to `output_dir`, keyed on the full directory
/// name and the snapshot content.
fn staging_dir(
    output_dir: &Path,
    users: &[UserProfile],
    snapshot: &StoreSnapshot,
) -> Result<PathBuf, SnapshotWriteError> {
    let name = output_dir
        .file_name()
        .ok_or_else(|| SnapshotWriteError::InvalidOutputPath(output_dir.to_path_buf()))?;

    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(users)?);
    hasher.update(serde_json::to_vec(&snapshot.posts)?);
    hasher.update(serde_json::to_vec(&snapshot.popular)?);
    let hash = hex::encode(hasher.finalize());

    Ok(output_dir.with_file_name(format!("{}.tmp.{}", name.to_string_lossy(), &hash[..12])))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), SnapshotWriteError> {
    let f = fs::File::create(path)?;
    serde_json::to_writer_pretty(&f, value)?;
    f.sync_all()?;
    Ok(())
}

impl FeedStore for FileStore {
    fn fetch_user_profile(&self, id: &UserId) -> Result<UserProfile, StoreError> {
        self.users()?
            .into_iter()
            .find(|u| &u.id == id)
            .ok_or_else(|| StoreError::UserNotFound(id.clone()))
    }

    fn fetch_popular_posts(&self) -> Result<Option<Vec<PostRecord>>, StoreError> {
        if !self.root.is_dir() {
            return Err(StoreError::Unavailable(format!(
                "{}: snapshot directory missing",
                self.root.display()
            )));
        }
        // A snapshot without popular.json has simply never had the list built
        let popular: PopularPosts = match fs::File::open(self.root.join(POPULAR_FILE)) {
            Ok(f) => serde_json::from_reader(f)
                .map_err(|e| StoreError::Malformed(format!("{POPULAR_FILE}: {e}")))?,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Unavailable(format!("{POPULAR_FILE}: {e}"))),
        };

        let posts = self.posts()?;
        Ok(Some(
            popular
                .post_ids
                .iter()
                .filter_map(|id| posts.iter().find(|p| &p.id == id).cloned())
                .collect(),
        ))
    }

    fn fetch_posts_by_tag(
        &self,
        tag: &str,
        _projection: PostProjection,
    ) -> Result<Vec<PostRecord>, StoreError> {
        Ok(self.posts()?.into_iter().filter(|p| p.has_tag(tag)).collect())
    }

    fn fetch_posts_by_creator_set(
        &self,
        creator_ids: &[UserId],
        _projection: PostProjection,
    ) -> Result<Vec<PostRecord>, StoreError> {
        Ok(self
            .posts()?
            .into_iter()
            .filter(|p| creator_ids.contains(&p.creator_id))
            .collect())
    }

    fn fetch_creator(&self, id: &UserId) -> Result<Option<CreatorRecord>, StoreError> {
        Ok(self.users()?.into_iter().find(|u| &u.id == id).map(|u| CreatorRecord {
            id: u.id,
            secondary_id: u.secondary_id,
        }))
    }
}
