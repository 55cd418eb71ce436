use dashmap::DashSet;

/// Per-service collision set for document file ids.
///
/// Ids are handed out with an atomic insert so concurrent runners settle
/// on `name.ext`, `name1.ext`, `name2.ext`, … without duplicates. The
/// assignment for a fixed (name, extension) multiset is deterministic
/// regardless of which worker asks first.
#[derive(Debug, Default)]
pub struct FileIdSet {
    ids: DashSet<String>,
}

impl FileIdSet {
    pub fn new() -> Self {
        FileIdSet { ids: DashSet::new() }
    }

    pub fn generate(&self, doc_name: &str, extension: &str) -> String {
        let ext = if extension.is_empty() {
            String::new()
        } else {
            format!(".{extension}")
        };

        let candidate = format!("{doc_name}{ext}");
        if self.ids.insert(candidate.clone()) {
            return candidate;
        }
        for i in 1u32.. {
            let candidate = format!("{doc_name}{i}{ext}");
            if self.ids.insert(candidate.clone()) {
                return candidate;
            }
        }
        unreachable!("file id space exhausted")
    }
}
