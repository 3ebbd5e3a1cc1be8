use orc_core::ValidationError;
use std::time::{SystemTime, UNIX_EPOCH};

/// One item in a batch after normalization.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub index: usize,
    pub text: String,
    pub custom_id: Option<String>,
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the unix epoch")
        .as_secs()
}

/// `{prefix or "batch"}_{unix_seconds}`. Two batches started within the same
/// second and the same prefix collide; the stats manager overwrites and
/// warns rather than failing.
pub fn make_batch_id(prefix: Option<&str>) -> String {
    format!("{}_{}", prefix.unwrap_or("batch"), unix_seconds())
}

/// `"{batch_id}_req_{index}"`, the synthesized id for an item with no
/// caller-supplied `custom_id`.
pub fn synthesize_id(batch_id: &str, index: usize) -> String {
    format!("{batch_id}_req_{index}")
}

/// Validates `custom_ids` is either absent or exactly as long as `texts`,
/// then pairs each text with its normalized id (custom or synthesized).
pub fn normalize_items(
    batch_id: &str,
    texts: &[String],
    custom_ids: Option<&[Option<String>]>,
) -> Result<Vec<BatchItem>, ValidationError> {
    if let Some(ids) = custom_ids {
        if ids.len() != texts.len() {
            return Err(ValidationError::CustomIdsLengthMismatch {
                expected: texts.len(),
                got: ids.len(),
            });
        }
    }

    Ok(texts
        .iter()
        .enumerate()
        .map(|(index, text)| {
            let custom_id = custom_ids
                .and_then(|ids| ids[index].clone())
                .or_else(|| Some(synthesize_id(batch_id, index)));
            BatchItem {
                index,
                text: text.clone(),
                custom_id,
            }
        })
        .collect())
}
