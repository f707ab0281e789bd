use serde::{Deserialize, Serialize};

/// A method as named by the profiler: fully qualified name plus signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodEntry {
    pub name: String,
    pub signature: String,
}

impl MethodEntry {
    /// Split a wire entry such as `"com.example.Foo.bar (I)V"` at the first
    /// space. Entries without a signature keep an empty one.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(' ') {
            Some((name, signature)) => Self {
                name: name.to_string(),
                signature: signature.trim().to_string(),
            },
            None => Self {
                name: raw.to_string(),
                signature: String::new(),
            },
        }
    }

    pub fn label(&self) -> String {
        if self.signature.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.name, self.signature)
        }
    }
}

/// Method index to `(name, signature)` table shipped with each profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodLookup {
    entries: Vec<MethodEntry>,
}

impl MethodLookup {
    pub fn from_wire<S: AsRef<str>>(raw: &[S]) -> Self {
        Self {
            entries: raw.iter().map(|s| MethodEntry::parse(s.as_ref())).collect(),
        }
    }

    pub fn get(&self, method: usize) -> Option<&MethodEntry> {
        self.entries.get(method)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_name_and_signature() {
        let entry = MethodEntry::parse("java.lang.Thread.run ()V");
        assert_eq!(entry.name, "java.lang.Thread.run");
        assert_eq!(entry.signature, "()V");
        assert_eq!(entry.label(), "java.lang.Thread.run ()V");
    }

    #[test]
    fn missing_signature_defaults_to_empty() {
        let entry = MethodEntry::parse("~ ROOT ~");
        assert_eq!(entry.name, "~");
        assert_eq!(entry.signature, "ROOT ~");

        let bare = MethodEntry::parse("main");
        assert_eq!(bare.signature, "");
        assert_eq!(bare.label(), "main");
    }

    #[test]
    fn lookup_out_of_range_is_none() {
        let lookup = MethodLookup::from_wire(&["a", "b"]);
        assert_eq!(lookup.len(), 2);
        assert!(lookup.get(2).is_none());
    }
}
