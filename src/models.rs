use base64::Engine;
use serde::{Serialize, Deserialize};
use serde_with::{serde_as, DefaultOnNull, DisplayFromStr, PickFirst};
use std::fmt;

use crate::error::Result;

/// Inbound request body. Form builders tend to send numbers as strings and
/// blank fields as `null`, so both are accepted.
#[serde_as]
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct GenerationRequest {
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub prompt: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_images: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colour_palette: Option<ColourPalette>,
}

#[serde_as]
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ColourPalette {
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub members: Vec<PaletteMember>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PaletteMember {
    pub color_hex: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_weight: Option<ColorWeight>,
}

/// Weights are forwarded as written; strings pass through untouched.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum ColorWeight {
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for ColorWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorWeight::Number(n) => write!(f, "{}", n),
            ColorWeight::Text(s) => f.write_str(s),
        }
    }
}

impl GenerationRequest {
    /// Decodes a raw invocation body. Yields `PipelineError::Decode` for bad
    /// base64 and `PipelineError::Parse` for bad JSON.
    pub fn from_body(body: &[u8], is_base64_encoded: bool) -> Result<Self> {
        let decoded;
        let json = if is_base64_encoded {
            let compact: Vec<u8> = body.iter().copied().filter(|b| !b.is_ascii_whitespace()).collect();
            decoded = base64::engine::general_purpose::STANDARD.decode(compact)?;
            decoded.as_slice()
        } else {
            body
        };
        Ok(serde_json::from_slice(json)?)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct GenerationResult {
    pub created: String,
    pub data: Vec<GeneratedImage>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct GeneratedImage {
    pub prompt: String,
    pub resolution: String,
    pub is_image_safe: bool,
    pub seed: i64,
    pub url: String,
    pub style_type: String,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct BackgroundRemovalResult {
    pub original: Option<String>,
    pub high_resolution: Option<String>,
    pub preview: Option<String>,
    pub url: Option<String>,
}

impl BackgroundRemovalResult {
    /// First non-empty URL in priority order, with the field it came from.
    pub fn image_url(&self) -> Option<(&'static str, &str)> {
        [
            ("original", &self.original),
            ("high_resolution", &self.high_resolution),
            ("preview", &self.preview),
            ("url", &self.url),
        ]
        .into_iter()
        .find_map(|(field, value)| {
            value.as_deref().filter(|v| !v.is_empty()).map(|v| (field, v))
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ImageUrls {
    pub image_urls: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use pretty_assertions::assert_eq;

    const FULL_BODY: &str = r##"{
        "prompt": "A futuristic cityscape",
        "filename": "city",
        "resolution": "1024x1024",
        "aspect_ratio": "16x9",
        "num_images": 2,
        "style_type": "DESIGN",
        "colour_palette": {"members": [
            {"color_hex": "#112233", "color_weight": 0.6},
            {"color_hex": "#445566"}
        ]}
    }"##;

    fn full_request() -> GenerationRequest {
        GenerationRequest {
            prompt: "A futuristic cityscape".into(),
            filename: "city".into(),
            resolution: Some("1024x1024".into()),
            aspect_ratio: Some("16x9".into()),
            num_images: Some(2),
            style_type: Some("DESIGN".into()),
            colour_palette: Some(ColourPalette {
                members: vec![
                    PaletteMember { color_hex: "#112233".into(), color_weight: Some(ColorWeight::Number(serde_json::Number::from_f64(0.6).unwrap())) },
                    PaletteMember { color_hex: "#445566".into(), color_weight: None },
                ],
            }),
        }
    }

    #[test]
    fn plain_body_maps_every_field() {
        let request = GenerationRequest::from_body(FULL_BODY.as_bytes(), false).unwrap();
        assert_eq!(request, full_request());
    }

    #[test]
    fn base64_body_matches_plain_body() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(FULL_BODY);
        let request = GenerationRequest::from_body(encoded.as_bytes(), true).unwrap();
        assert_eq!(request, full_request());
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let request = GenerationRequest::from_body(br#"{"prompt":"cat"}"#, false).unwrap();
        assert_eq!(request, GenerationRequest { prompt: "cat".into(), ..Default::default() });
    }

    #[test]
    fn missing_prompt_is_tolerated() {
        let request = GenerationRequest::from_body(br#"{"filename":"x"}"#, false).unwrap();
        assert_eq!(request.prompt, "");
        assert_eq!(request.filename, "x");
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let body = br##"{"prompt":"p","num_images":"3","colour_palette":{"members":[{"color_hex":"#fff","color_weight":"0.25"}]}}"##;
        let request = GenerationRequest::from_body(body, false).unwrap();
        assert_eq!(request.num_images, Some(3));
        let members = request.colour_palette.unwrap().members;
        assert_eq!(members[0].color_weight, Some(ColorWeight::Text("0.25".into())));
    }

    #[test]
    fn null_fields_fall_back_to_defaults() {
        let request = GenerationRequest::from_body(br#"{"prompt":null,"filename":"x"}"#, false).unwrap();
        assert_eq!(request.prompt, "");
        assert_eq!(request.filename, "x");

        let body = br#"{"prompt":"p","filename":null,"resolution":null,"num_images":null,"colour_palette":{"members":null}}"#;
        let request = GenerationRequest::from_body(body, false).unwrap();
        assert_eq!(
            request,
            GenerationRequest {
                prompt: "p".into(),
                colour_palette: Some(ColourPalette::default()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn color_weight_keeps_its_written_form() {
        let body = br##"{"colour_palette":{"members":[{"color_hex":"#fff","color_weight":"0.50"},{"color_hex":"#000","color_weight":0.3}]}}"##;
        let members = GenerationRequest::from_body(body, false).unwrap().colour_palette.unwrap().members;
        assert_eq!(members[0].color_weight.as_ref().unwrap().to_string(), "0.50");
        assert_eq!(members[1].color_weight.as_ref().unwrap().to_string(), "0.3");
    }

    #[test]
    fn bad_base64_is_a_decode_error() {
        let err = GenerationRequest::from_body(b"%%%not-base64%%%", true).unwrap_err();
        assert!(matches!(err, PipelineError::Decode(_)));
    }

    #[test]
    fn bad_json_is_a_parse_error() {
        let err = GenerationRequest::from_body(b"{\"prompt\":", false).unwrap_err();
        assert!(matches!(err, PipelineError::Parse(_)));

        let encoded = base64::engine::general_purpose::STANDARD.encode("not json");
        let err = GenerationRequest::from_body(encoded.as_bytes(), true).unwrap_err();
        assert!(matches!(err, PipelineError::Parse(_)));
    }

    #[test]
    fn generation_result_parses_ideogram_payload() {
        let body = r#"{
            "created": "2025-01-01T00:00:00Z",
            "data": [{
                "prompt": "A futuristic cityscape",
                "resolution": "1024x1024",
                "is_image_safe": true,
                "seed": 12345,
                "url": "https://ideogram.ai/api/images/ephemeral/abc.png",
                "style_type": "GENERAL"
            }]
        }"#;
        let result: GenerationResult = serde_json::from_str(body).unwrap();
        assert_eq!(result.created, "2025-01-01T00:00:00Z");
        assert_eq!(result.data.len(), 1);
        assert_eq!(result.data[0].seed, 12345);
        assert!(result.data[0].is_image_safe);
        assert_eq!(result.data[0].url, "https://ideogram.ai/api/images/ephemeral/abc.png");
    }

    #[test]
    fn removal_url_follows_priority_order() {
        let result: BackgroundRemovalResult = serde_json::from_str(
            r#"{"original":"","high_resolution":"https://hr","preview":"https://pv","url":"https://u"}"#,
        )
        .unwrap();
        assert_eq!(result.image_url(), Some(("high_resolution", "https://hr")));

        let only_url: BackgroundRemovalResult = serde_json::from_str(r#"{"url":"https://u"}"#).unwrap();
        assert_eq!(only_url.image_url(), Some(("url", "https://u")));

        let original: BackgroundRemovalResult =
            serde_json::from_str(r#"{"original":"https://o","url":"https://u"}"#).unwrap();
        assert_eq!(original.image_url(), Some(("original", "https://o")));
    }

    #[test]
    fn removal_without_urls_selects_nothing() {
        let result: BackgroundRemovalResult = serde_json::from_str(r#"{"message":"quota"}"#).unwrap();
        assert_eq!(result.image_url(), None);
    }

    #[test]
    fn image_urls_serialize_with_expected_key() {
        let body = serde_json::to_string(&ImageUrls { image_urls: vec!["https://a".into()] }).unwrap();
        assert_eq!(body, r#"{"image_urls":["https://a"]}"#);
    }
}
