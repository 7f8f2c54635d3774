use serde::{Deserialize, Deserializer, Serialize};

/// One sighting of an (email, phone) pair, normalized.
///
/// Blank values (empty or whitespace only) are treated as absent. Present
/// values are kept exactly as received: no trimming or case folding, since
/// matching is by exact equality.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Observation {
    email: Option<String>,
    phone: Option<String>,
}

impl Observation {
    pub fn new(email: Option<String>, phone: Option<String>) -> Self {
        Self {
            email: non_blank(email),
            phone: non_blank(phone),
        }
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    /// Returns `true` if neither field carries a value.
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.phone.is_none()
    }

    pub fn into_parts(self) -> (Option<String>, Option<String>) {
        (self.email, self.phone)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Body of an identify call.
///
/// `phoneNumber` is accepted either as a string or as a JSON number. Missing
/// keys mean `null`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub phone_number: Option<String>,
}

impl IdentifyRequest {
    pub fn new(email: Option<&str>, phone_number: Option<&str>) -> Self {
        Self {
            email: email.map(str::to_string),
            phone_number: phone_number.map(str::to_string),
        }
    }
}

impl From<IdentifyRequest> for Observation {
    fn from(request: IdentifyRequest) -> Self {
        Observation::new(request.email, request.phone_number)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<StringOrNumber>::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    }))
}
