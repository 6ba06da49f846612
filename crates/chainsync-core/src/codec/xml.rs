use chainsync_domain::{Job, JobChainNode};
use quick_xml::se::Serializer;
use serde::{Deserialize, Serialize};

use super::{CodecError, RecordCodec};

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// `<job_chain>` documents as read by the JobScheduler live folder.
///
/// The chain name comes from the file name and the scheduler from the folder,
/// so neither is written into the document.
#[derive(Debug, Clone, Copy, Default)]
pub struct JobChainXmlCodec;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename = "job_chain")]
struct JobChainDocument {
    #[serde(rename = "@title", default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(rename = "@orders_recoverable", default = "yes", with = "yes_no")]
    orders_recoverable: bool,
    #[serde(rename = "@visible", default = "yes", with = "yes_no")]
    visible: bool,
    #[serde(rename = "@distributed", default, with = "yes_no")]
    distributed: bool,
    #[serde(rename = "@max_orders", default, skip_serializing_if = "Option::is_none")]
    max_orders: Option<u32>,
    #[serde(rename = "job_chain_node", default)]
    nodes: Vec<NodeElement>,
}

#[derive(Debug, Serialize, Deserialize)]
struct NodeElement {
    #[serde(rename = "@state")]
    state: String,
    #[serde(rename = "@job", default, skip_serializing_if = "Option::is_none")]
    job: Option<String>,
    #[serde(rename = "@next_state", default, skip_serializing_if = "Option::is_none")]
    next_state: Option<String>,
    #[serde(rename = "@error_state", default, skip_serializing_if = "Option::is_none")]
    error_state: Option<String>,
    #[serde(rename = "@delay", default, skip_serializing_if = "Option::is_none")]
    delay: Option<u32>,
}

fn yes() -> bool {
    true
}

mod yes_no {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub(super) fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "yes" } else { "no" })
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "yes" | "true" | "1" => Ok(true),
            "no" | "false" | "0" => Ok(false),
            other => Err(D::Error::custom(format!("expected yes or no, got '{other}'"))),
        }
    }
}

impl From<&Job> for JobChainDocument {
    fn from(job: &Job) -> Self {
        Self {
            title: job.title.clone(),
            orders_recoverable: job.orders_recoverable,
            visible: job.visible,
            distributed: job.distributed,
            max_orders: job.max_orders,
            nodes: job
                .nodes
                .iter()
                .map(|node| NodeElement {
                    state: node.state.clone(),
                    job: node.job.clone(),
                    next_state: node.next_state.clone(),
                    error_state: node.error_state.clone(),
                    delay: node.delay,
                })
                .collect(),
        }
    }
}

impl From<JobChainDocument> for Job {
    fn from(doc: JobChainDocument) -> Self {
        Job {
            title: doc.title,
            orders_recoverable: doc.orders_recoverable,
            visible: doc.visible,
            distributed: doc.distributed,
            max_orders: doc.max_orders,
            nodes: doc
                .nodes
                .into_iter()
                .map(|node| JobChainNode {
                    state: node.state,
                    job: node.job,
                    next_state: node.next_state,
                    error_state: node.error_state,
                    delay: node.delay,
                })
                .collect(),
            ..Job::default()
        }
    }
}

impl RecordCodec for JobChainXmlCodec {
    fn encode(&self, job: &Job) -> Result<Vec<u8>, CodecError> {
        let mut xml = String::from(XML_DECLARATION);
        let mut serializer = Serializer::new(&mut xml);
        serializer.indent(' ', 2);
        JobChainDocument::from(job)
            .serialize(serializer)
            .map_err(|err| CodecError::Render(err.to_string()))?;
        xml.push('\n');
        Ok(xml.into_bytes())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Job, CodecError> {
        let text = std::str::from_utf8(bytes)?;
        let doc: JobChainDocument =
            quick_xml::de::from_str(text).map_err(|err| CodecError::Parse(err.to_string()))?;
        Ok(doc.into())
    }
}
