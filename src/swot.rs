//! SWOT bucket editing and the context text the gateway prompts are built from.
use crate::document::{IdSource, SwotBucket, SwotData, SwotItem};
use serde::Deserialize;

/// Fallback text when no diagnosis analysis exists yet.
const NO_DIAGNOSIS_CONTEXT: &str =
    "No specific diagnosis analysis provided. Proceed based on SWOT items.";

/// Append an item to a bucket, returning the updated data.
pub fn add_item(swot: &SwotData, bucket: SwotBucket, text: &str, ids: &mut IdSource) -> SwotData {
    let mut next = swot.clone();
    next.bucket_mut(bucket).push(SwotItem {
        id: ids.next_id(),
        text: text.to_string(),
    });
    next
}

/// Replace an item's text; unknown ids leave the data unchanged.
pub fn update_item(swot: &SwotData, bucket: SwotBucket, id: &str, text: &str) -> SwotData {
    let mut next = swot.clone();
    if let Some(item) = next.bucket_mut(bucket).iter_mut().find(|item| item.id == id) {
        item.text = text.to_string();
    }
    next
}

/// Remove an item; unknown ids leave the data unchanged.
pub fn delete_item(swot: &SwotData, bucket: SwotBucket, id: &str) -> SwotData {
    let mut next = swot.clone();
    next.bucket_mut(bucket).retain(|item| item.id != id);
    next
}

/// Shape of a SWOT file extraction. Missing buckets are left alone.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct SwotImport {
    #[serde(default)]
    pub strengths: Option<Vec<String>>,
    #[serde(default)]
    pub weaknesses: Option<Vec<String>>,
    #[serde(default)]
    pub opportunities: Option<Vec<String>>,
    #[serde(default)]
    pub threats: Option<Vec<String>>,
}

impl SwotImport {
    fn bucket(&self, bucket: SwotBucket) -> Option<&[String]> {
        match bucket {
            SwotBucket::Strengths => self.strengths.as_deref(),
            SwotBucket::Weaknesses => self.weaknesses.as_deref(),
            SwotBucket::Opportunities => self.opportunities.as_deref(),
            SwotBucket::Threats => self.threats.as_deref(),
        }
    }
}

/// Append imported items after the existing ones; never replaces.
pub fn import_items(swot: &SwotData, import: &SwotImport, ids: &mut IdSource) -> SwotData {
    let mut next = swot.clone();
    for bucket in SwotBucket::ALL {
        if let Some(texts) = import.bucket(bucket) {
            let items = next.bucket_mut(bucket);
            items.extend(texts.iter().map(|text| SwotItem {
                id: ids.next_id(),
                text: text.clone(),
            }));
        }
    }
    next
}

fn joined(swot: &SwotData, bucket: SwotBucket) -> String {
    swot.bucket(bucket)
        .iter()
        .map(|item| item.text.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Context block for the SWOT matrix analysis prompt.
pub fn swot_context(swot: &SwotData, diagnosis_analysis: &str) -> String {
    let mut context = String::new();
    for bucket in SwotBucket::ALL {
        context.push_str(&format!("{}: {}\n", bucket.title(), joined(swot, bucket)));
    }
    context.push_str("\n[ESG Self-Diagnosis Results & Suggestions]\n");
    if diagnosis_analysis.trim().is_empty() {
        context.push_str(NO_DIAGNOSIS_CONTEXT);
    } else {
        context.push_str(diagnosis_analysis.trim());
    }
    context.push('\n');
    context
}

/// The SO/WO/ST/WT matrix as JSON text, used as strategy-prompt context.
pub fn matrix_text(swot: &SwotData) -> String {
    swot.analysis
        .as_ref()
        .and_then(|analysis| serde_json::to_string(&analysis.matrix).ok())
        .unwrap_or_else(|| "SWOT Matrix not fully generated yet.".to_string())
}
