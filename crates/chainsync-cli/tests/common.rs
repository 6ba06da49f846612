#![allow(dead_code)]

use std::fs;

use assert_cmd::assert::Assert;
use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use camino::Utf8PathBuf;
use serde_json::Value;
use tempfile::TempDir;

/// A throwaway live folder plus store file, wired through the environment.
pub struct Workspace {
    _temp: TempDir,
    pub live: Utf8PathBuf,
    pub store: Utf8PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let temp = tempfile::Builder::new()
            .prefix("chainsync-cli")
            .tempdir()
            .expect("tempdir");
        let base = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf-8 tempdir");
        let live = base.join("live");
        fs::create_dir_all(&live).expect("live folder");
        Self {
            store: base.join("store.json"),
            live,
            _temp: temp,
        }
    }

    pub fn scope(&self, scheduler: &str) -> Utf8PathBuf {
        let dir = self.live.join(scheduler);
        fs::create_dir_all(&dir).expect("scope dir");
        dir
    }

    pub fn seed(&self, scheduler: &str, name: &str, xml: &str) -> Utf8PathBuf {
        let path = self.scope(scheduler).join(format!("{name}.job_chain.xml"));
        fs::write(&path, xml).expect("seed file");
        path
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("chainsync");
        cmd.env_remove("CHAINSYNC_ON_MALFORMED")
            .env("CHAINSYNC_LIVE_FOLDER", self.live.as_str())
            .env("CHAINSYNC_STORE", self.store.as_str());
        cmd
    }
}

pub fn parse_json(assert: &Assert) -> Value {
    serde_json::from_slice(&assert.get_output().stdout).expect("valid json")
}
