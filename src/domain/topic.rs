#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Cs,
    Physics,
    Bio,
    Math,
}

impl Topic {
    pub const ALL: [Topic; 4] = [Topic::Cs, Topic::Physics, Topic::Bio, Topic::Math];

    pub fn parse(tag: String) -> Result<Topic, String> {
        match tag.trim().to_lowercase().as_str() {
            "cs" => Ok(Topic::Cs),
            "physics" => Ok(Topic::Physics),
            "bio" => Ok(Topic::Bio),
            "math" => Ok(Topic::Math),
            _ => Err(format!(
                "{} is not a supported topic. Choose from cs, physics, bio or math",
                tag
            )),
        }
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        match self {
            Topic::Cs => "cs",
            Topic::Physics => "physics",
            Topic::Bio => "bio",
            Topic::Math => "math",
        }
    }
}
