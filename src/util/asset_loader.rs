use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use minijinja::{Environment, Error, State};
use sha2::{Digest, Sha256};

/// Resolves `asset("style.css")` in templates to a cache-busting URL.
#[derive(Debug, Clone)]
pub struct AssetLoader {
    root: PathBuf,
    cache: Arc<RwLock<HashMap<String, String>>>,
}

impl AssetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: Arc::default(),
        }
    }

    pub fn asset_path(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if let Some(hashed_path) = self.cache.read().ok().and_then(|c| c.get(path).cloned()) {
            return hashed_path;
        }

        let Ok(contents) = fs::read(self.root.join(path)) else {
            // Not cached: the file may appear later.
            return format!("/static/{}", path);
        };

        let digest = format!("{:x}", Sha256::digest(&contents));
        let hashed_path = format!("/static/{}?v={}", path, &digest[..16]);
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(path.to_string(), hashed_path.clone());
        }
        hashed_path
    }

    pub fn register(&self, env: &mut Environment<'_>) {
        let loader = self.clone();
        env.add_function("asset", move |_state: &State, path: String| -> Result<String, Error> {
            Ok(loader.asset_path(&path))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_asset_keeps_plain_path() {
        let loader = AssetLoader::new("does-not-exist");
        assert_eq!(loader.asset_path("style.css"), "/static/style.css");
    }

    #[test]
    fn existing_asset_gets_content_hash() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("style.css"), "body { margin: 0 }").unwrap();
        let loader = AssetLoader::new(dir.path());

        let first = loader.asset_path("style.css");
        assert!(first.starts_with("/static/style.css?v="));
        assert_eq!(first.len(), "/static/style.css?v=".len() + 16);
        assert_eq!(loader.asset_path("style.css"), first);
    }

    #[test]
    fn hash_changes_with_content() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        fs::write(a.path().join("app.js"), "one").unwrap();
        fs::write(b.path().join("app.js"), "two").unwrap();

        assert_ne!(
            AssetLoader::new(a.path()).asset_path("app.js"),
            AssetLoader::new(b.path()).asset_path("app.js")
        );
    }
}
