use camino::Utf8PathBuf;

/// File name suffix of every job chain document in the live folder.
pub const JOB_CHAIN_SUFFIX: &str = ".job_chain.xml";

/// Maps scheduler and job names onto the live folder layout:
/// `{root}/{scheduler}/{job}.job_chain.xml`.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: Utf8PathBuf,
}

impl PathResolver {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn scope_dir(&self, scheduler: &str) -> Utf8PathBuf {
        self.root.join(scheduler)
    }

    #[must_use]
    pub fn resolve(&self, scheduler: &str, job: &str) -> Utf8PathBuf {
        self.scope_dir(scheduler).join(format!("{job}{JOB_CHAIN_SUFFIX}"))
    }

    /// Job name encoded in a file name, if it carries the job chain suffix.
    #[must_use]
    pub fn job_name_from_file(file_name: &str) -> Option<&str> {
        let stem_len = file_name.len().checked_sub(JOB_CHAIN_SUFFIX.len())?;
        if !has_suffix_ignore_case(file_name, JOB_CHAIN_SUFFIX) {
            return None;
        }
        let stem = file_name.get(..stem_len)?;
        (!stem.is_empty()).then_some(stem)
    }
}

pub(crate) fn has_suffix_ignore_case(name: &str, suffix: &str) -> bool {
    name.len()
        .checked_sub(suffix.len())
        .and_then(|start| name.get(start..))
        .is_some_and(|tail| tail.eq_ignore_ascii_case(suffix))
}
