use serde::{Deserialize, Serialize};

/// Label in the console's two UI languages.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct I18nText {
    #[serde(rename = "zh_Hans", default, skip_serializing_if = "Option::is_none")]
    pub zh_hans: Option<String>,
    #[serde(rename = "en_US", default, skip_serializing_if = "Option::is_none")]
    pub en_us: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_size: Option<u32>,
    /// `chat` or `completion`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LlmModel {
    pub model: String,
    #[serde(default)]
    pub label: I18nText,
    pub model_type: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub fetch_from: String,
    #[serde(default)]
    pub model_properties: ModelProperties,
    #[serde(default)]
    pub deprecated: bool,
    /// `active` when credentials are configured.
    pub status: String,
    #[serde(default)]
    pub load_balancing_enabled: bool,
}

impl LlmModel {
    pub fn is_active(&self) -> bool {
        self.status == "active" && !self.deprecated
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LlmProvider {
    #[serde(default)]
    pub tenant_id: String,
    pub provider: String,
    #[serde(default)]
    pub label: I18nText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_small: Option<I18nText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_large: Option<I18nText>,
    pub status: String,
    #[serde(default)]
    pub models: Vec<LlmModel>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LlmProviderList {
    #[serde(default)]
    pub data: Vec<LlmProvider>,
}

impl LlmProviderList {
    /// `(provider, model)` pairs usable right now.
    pub fn active_models(&self) -> impl Iterator<Item = (&LlmProvider, &LlmModel)> {
        self.data.iter().flat_map(|provider| {
            provider
                .models
                .iter()
                .filter(|model| model.is_active())
                .map(move |model| (provider, model))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_provider_list_and_filters_active_models() {
        let list: LlmProviderList = serde_json::from_value(json!({
            "data": [{
                "tenant_id": "tenant-1",
                "provider": "langgenius/openai/openai",
                "label": {"zh_Hans": "OpenAI", "en_US": "OpenAI"},
                "icon_small": {"zh_Hans": "https://x/icon.svg", "en_US": "https://x/icon.svg"},
                "icon_large": {"zh_Hans": "https://x/icon_l.svg", "en_US": "https://x/icon_l.svg"},
                "status": "active",
                "models": [
                    {
                        "model": "gpt-4o",
                        "label": {"zh_Hans": "gpt-4o", "en_US": "gpt-4o"},
                        "model_type": "llm",
                        "features": ["multi-tool-call", "vision"],
                        "fetch_from": "predefined-model",
                        "model_properties": {"context_size": 128_000, "mode": "chat"},
                        "deprecated": false,
                        "status": "active",
                        "load_balancing_enabled": false
                    },
                    {
                        "model": "gpt-3.5-turbo-0301",
                        "model_type": "llm",
                        "fetch_from": "predefined-model",
                        "model_properties": {"mode": "chat"},
                        "deprecated": true,
                        "status": "active"
                    },
                    {
                        "model": "o1",
                        "model_type": "llm",
                        "status": "no-configure"
                    }
                ]
            }]
        }))
        .unwrap();

        let active: Vec<&str> = list.active_models().map(|(_, m)| m.model.as_str()).collect();
        assert_eq!(active, vec!["gpt-4o"]);
        assert_eq!(list.data[0].label.en_us.as_deref(), Some("OpenAI"));
        assert_eq!(list.data[0].models[0].model_properties.context_size, Some(128_000));
    }
}
