//! Dispatcher configuration.

// ---------------------------------------------------------------------------
// DispatcherConfig
// ---------------------------------------------------------------------------

/// Tunables for a SOAP-aware dispatcher.
///
/// Only affects the mustUnderstand pre-check installed by
/// `MessageDispatcher::soap_builder`; a plain dispatcher ignores it.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Reason text of the fault written when a mandatory header block is not
    /// understood.
    pub must_understand_fault_string: String,
    /// `xml:lang` of that reason text.
    pub fault_string_lang: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            must_understand_fault_string:
                "One or more mandatory SOAP header blocks not understood".to_string(),
            fault_string_lang: "en".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = DispatcherConfig::default();
        assert!(!config.must_understand_fault_string.is_empty());
        assert_eq!(config.fault_string_lang, "en");
    }
}
