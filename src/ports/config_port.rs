//! Settings access port.

pub trait ConfigPort {
    /// Raw value of `key` in `section`, if present.
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
}
