//! Transaction id generation

/// Produces a fresh unique identifier when the caller supplies none
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// ULID-based generator
///
/// Using ULID provides:
/// - Monotonic, sortable IDs
/// - No coordination needed (no machine_id)
///
/// Ids are returned bare, without the transaction prefix.
#[derive(Debug, Default, Clone, Copy)]
pub struct UlidIdGenerator;

impl IdGenerator for UlidIdGenerator {
    fn generate(&self) -> String {
        ulid::Ulid::new().to_string()
    }
}

/// Generator that always returns the same id
#[cfg(test)]
pub struct FixedIdGenerator(pub &'static str);

#[cfg(test)]
impl IdGenerator for FixedIdGenerator {
    fn generate(&self) -> String {
        self.0.to_string()
    }
}
