use serde::{Deserialize, Serialize};

// ── Service constants ──

/// Endpoint the remote schema declares as its default.
pub const DEFAULT_ENDPOINT: &str = "https://server.budecredits.de/";

/// Key under which the configuration record is kept in browser storage.
pub const CONFIG_STORAGE_KEY: &str = "ai-wallet-config";

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";

// ── Capabilities ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityId {
    Llm,
    Vlm,
    Sst,
    Tts,
}

impl CapabilityId {
    pub const ALL: [CapabilityId; 4] = [
        CapabilityId::Llm,
        CapabilityId::Vlm,
        CapabilityId::Sst,
        CapabilityId::Tts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityId::Llm => "llm",
            CapabilityId::Vlm => "vlm",
            CapabilityId::Sst => "sst",
            CapabilityId::Tts => "tts",
        }
    }

    /// Case-insensitive parse; anything outside the four known ids is `None`.
    pub fn parse(value: &str) -> Option<CapabilityId> {
        match value.to_ascii_lowercase().as_str() {
            "llm" => Some(CapabilityId::Llm),
            "vlm" => Some(CapabilityId::Vlm),
            "sst" => Some(CapabilityId::Sst),
            "tts" => Some(CapabilityId::Tts),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CapabilityId::Llm => "Language",
            CapabilityId::Vlm => "Vision",
            CapabilityId::Sst => "Speech-to-Text",
            CapabilityId::Tts => "Text-to-Speech",
        }
    }
}

// ── Configuration ──

/// The persisted/shared configuration unit.
///
/// Wire form uses camelCase keys (`apiKey`, `enabledCapabilities`) to stay
/// compatible with records written by earlier deployments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WalletConfig {
    pub endpoint: String,
    pub api_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sst: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts: Option<String>,
    pub enabled_capabilities: Vec<CapabilityId>,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            api_key: String::new(),
            llm: None,
            vlm: None,
            sst: None,
            tts: None,
            enabled_capabilities: CapabilityId::ALL.to_vec(),
        }
    }
}

impl WalletConfig {
    pub fn selected_model(&self, capability: CapabilityId) -> Option<&str> {
        let slot = match capability {
            CapabilityId::Llm => &self.llm,
            CapabilityId::Vlm => &self.vlm,
            CapabilityId::Sst => &self.sst,
            CapabilityId::Tts => &self.tts,
        };
        slot.as_deref()
    }

    pub fn set_selected_model(&mut self, capability: CapabilityId, model_id: Option<String>) {
        let slot = match capability {
            CapabilityId::Llm => &mut self.llm,
            CapabilityId::Vlm => &mut self.vlm,
            CapabilityId::Sst => &mut self.sst,
            CapabilityId::Tts => &mut self.tts,
        };
        *slot = model_id.filter(|id| !id.is_empty());
    }

    pub fn is_enabled(&self, capability: CapabilityId) -> bool {
        self.enabled_capabilities.contains(&capability)
    }

    /// Flip membership of `capability`, preserving insertion order of the rest.
    pub fn toggle_capability(&mut self, capability: CapabilityId) {
        if self.is_enabled(capability) {
            self.enabled_capabilities.retain(|c| *c != capability);
        } else {
            self.enabled_capabilities.push(capability);
        }
    }

    /// Field-wise merge: a field present in the patch replaces the current
    /// value, an absent field keeps it. Unknown capability strings in the
    /// patch are dropped, duplicates collapsed.
    pub fn merge(&mut self, patch: &ConfigPatch) {
        if let Some(endpoint) = &patch.endpoint {
            self.endpoint = endpoint.clone();
        }
        if let Some(api_key) = &patch.api_key {
            self.api_key = api_key.clone();
        }
        if let Some(llm) = &patch.llm {
            self.llm = Some(llm.clone());
        }
        if let Some(vlm) = &patch.vlm {
            self.vlm = Some(vlm.clone());
        }
        if let Some(sst) = &patch.sst {
            self.sst = Some(sst.clone());
        }
        if let Some(tts) = &patch.tts {
            self.tts = Some(tts.clone());
        }
        if let Some(raw) = &patch.enabled_capabilities {
            let mut enabled = Vec::new();
            for value in raw {
                if let Some(capability) = CapabilityId::parse(value) {
                    if !enabled.contains(&capability) {
                        enabled.push(capability);
                    }
                }
            }
            self.enabled_capabilities = enabled;
        }
    }

    pub fn setup_state(&self) -> SetupState {
        SetupState::for_config(self)
    }
}

/// Partial wire form of [`WalletConfig`]: what stores return when loading.
/// Every field optional so that merging can tell "absent" from "empty".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sst: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled_capabilities: Option<Vec<String>>,
}

// ── Setup state ──

/// Derived from the configuration, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupState {
    NeedsApiKey,
    NeedsEndpoint,
    Ready,
}

impl SetupState {
    pub fn for_config(config: &WalletConfig) -> SetupState {
        if config.api_key.is_empty() {
            SetupState::NeedsApiKey
        } else if config.endpoint.is_empty() {
            SetupState::NeedsEndpoint
        } else {
            SetupState::Ready
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SetupState::Ready)
    }
}

// ── Catalog entries ──

/// One model a provider endpoint advertises. Recreated wholesale on every
/// successful catalog fetch, never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: String,
    pub display_name: String,
    pub capabilities: Vec<CapabilityId>,
}

impl Model {
    pub fn supports(&self, capability: CapabilityId) -> bool {
        self.capabilities.contains(&capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_enables_all_capabilities() {
        let config = WalletConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert!(config.api_key.is_empty());
        assert_eq!(config.enabled_capabilities, CapabilityId::ALL.to_vec());
        assert_eq!(config.setup_state(), SetupState::NeedsApiKey);
    }

    #[test]
    fn wire_shape_uses_camel_case_keys() {
        let mut config = WalletConfig::default();
        config.api_key = "k".to_owned();
        config.llm = Some("m1".to_owned());

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["apiKey"], "k");
        assert_eq!(json["llm"], "m1");
        assert!(json.get("api_key").is_none());
        assert!(json.get("vlm").is_none(), "unset model slots are omitted");
        assert_eq!(json["enabledCapabilities"][0], "llm");
    }

    #[test]
    fn patch_merge_keeps_fields_absent_from_payload() {
        let mut config = WalletConfig::default();
        config.api_key = "keep-me".to_owned();
        config.llm = Some("m1".to_owned());

        let patch = ConfigPatch {
            endpoint: Some("https://other.example/v1".to_owned()),
            ..ConfigPatch::default()
        };
        config.merge(&patch);

        assert_eq!(config.endpoint, "https://other.example/v1");
        assert_eq!(config.api_key, "keep-me");
        assert_eq!(config.llm.as_deref(), Some("m1"));
    }

    #[test]
    fn merge_drops_unknown_capabilities_and_duplicates() {
        let mut config = WalletConfig::default();
        let patch = ConfigPatch {
            enabled_capabilities: Some(vec![
                "llm".to_owned(),
                "turbo".to_owned(),
                "LLM".to_owned(),
                "tts".to_owned(),
            ]),
            ..ConfigPatch::default()
        };
        config.merge(&patch);
        assert_eq!(
            config.enabled_capabilities,
            vec![CapabilityId::Llm, CapabilityId::Tts]
        );
    }

    #[test]
    fn seeded_record_parses_as_patch() {
        let raw = r#"{"apiKey":"k","endpoint":"https://x","llm":"m1","enabledCapabilities":["llm"]}"#;
        let patch: ConfigPatch = serde_json::from_str(raw).unwrap();

        let mut config = WalletConfig::default();
        config.merge(&patch);

        assert_eq!(config.api_key, "k");
        assert_eq!(config.endpoint, "https://x");
        assert_eq!(config.llm.as_deref(), Some("m1"));
        assert_eq!(config.vlm, None);
        assert_eq!(config.sst, None);
        assert_eq!(config.tts, None);
        assert_eq!(config.enabled_capabilities, vec![CapabilityId::Llm]);
        assert!(config.setup_state().is_ready());
    }

    #[test]
    fn setup_state_derivation() {
        let mut config = WalletConfig::default();
        assert_eq!(config.setup_state(), SetupState::NeedsApiKey);

        config.api_key = "k".to_owned();
        config.endpoint.clear();
        assert_eq!(config.setup_state(), SetupState::NeedsEndpoint);

        config.endpoint = "https://x".to_owned();
        assert_eq!(config.setup_state(), SetupState::Ready);
    }

    #[test]
    fn toggle_preserves_order_of_remaining_capabilities() {
        let mut config = WalletConfig::default();
        config.toggle_capability(CapabilityId::Vlm);
        assert_eq!(
            config.enabled_capabilities,
            vec![CapabilityId::Llm, CapabilityId::Sst, CapabilityId::Tts]
        );

        config.toggle_capability(CapabilityId::Vlm);
        assert_eq!(
            config.enabled_capabilities,
            vec![
                CapabilityId::Llm,
                CapabilityId::Sst,
                CapabilityId::Tts,
                CapabilityId::Vlm
            ]
        );
    }

    #[test]
    fn capability_parse_is_case_insensitive_and_closed() {
        assert_eq!(CapabilityId::parse("VLM"), Some(CapabilityId::Vlm));
        assert_eq!(CapabilityId::parse("tts"), Some(CapabilityId::Tts));
        assert_eq!(CapabilityId::parse("embedding"), None);
        assert_eq!(CapabilityId::parse(""), None);
    }

    #[test]
    fn empty_model_selection_is_normalized_to_unset() {
        let mut config = WalletConfig::default();
        config.set_selected_model(CapabilityId::Llm, Some(String::new()));
        assert_eq!(config.llm, None);

        config.set_selected_model(CapabilityId::Llm, Some("m1".to_owned()));
        assert_eq!(config.selected_model(CapabilityId::Llm), Some("m1"));
    }
}
