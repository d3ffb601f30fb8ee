//! Classifier features and the enriched projection served to readers

use super::application::Application;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Tag emitted for projects governed by a DAO
pub const DAO_GOVERNED_TAG: &str = "DAO governed";

/// Enumerated feature with a fixed set of display labels
///
/// The empty label is the explicit "unknown" option. Labels outside the set
/// decode as unknown so a slightly off-schema model reply still yields
/// usable features.
macro_rules! label_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub enum $name {
            #[default]
            Unknown,
            $($variant),+
        }

        impl $name {
            /// Every label in schema order, unknown (`""`) first
            pub const LABELS: &'static [&'static str] = &["", $($label),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    Self::Unknown => "",
                    $(Self::$variant => $label),+
                }
            }

            pub fn from_label(label: &str) -> Self {
                match label {
                    $($label => Self::$variant,)+
                    _ => Self::Unknown,
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let label = Option::<String>::deserialize(deserializer)?;
                Ok(label.map(|l| Self::from_label(l.trim())).unwrap_or_default())
            }
        }
    };
}

label_enum! {
    /// How long the project has existed
    ProjectAge {
        LessThanOneYear => "less than 1 year old",
        OneToTwoYears => "1-2 years old",
        TwoToThreeYears => "2-3 years old",
        ThreeToFiveYears => "3-5 years old",
        FiveToTenYears => "5-10 years old",
        OverTenYears => "10+ years old",
    }
}

label_enum! {
    /// Reported size of the user base
    UsersCount {
        UpTo100 => "1-100 users",
        UpTo1000 => "100-1000 users",
        UpTo2000 => "1000-2000 users",
        Over2000 => "2000+ users",
    }
}

label_enum! {
    /// Size of the team behind the project
    TeamSize {
        SoloFounder => "Solo founder",
        UpTo10 => "1-10 team members",
        UpTo50 => "11-50 team members",
        UpTo200 => "51-200 team members",
        Over200 => "200+ team members",
    }
}

/// Structured metadata extracted from one application's text
///
/// Field names match the `save_features` function arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Features {
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub enhanced_project_description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub technology_stack: Vec<String>,
    #[serde(default)]
    pub project_age: ProjectAge,
    #[serde(default)]
    pub users_count: UsersCount,
    #[serde(default)]
    pub team_size: TeamSize,
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub is_dao: bool,
}

impl Features {
    /// Flattened, searchable tag list
    ///
    /// Order: free tags, regions, team size, technology stack, project age,
    /// user count, then the DAO marker. Unknown enum options and blank
    /// strings are left out.
    pub fn searchable_tags(&self) -> Vec<String> {
        let dao = self.is_dao.then_some(DAO_GOVERNED_TAG);

        self.tags
            .iter()
            .chain(&self.regions)
            .map(String::as_str)
            .chain(std::iter::once(self.team_size.as_str()))
            .chain(self.technology_stack.iter().map(String::as_str))
            .chain(std::iter::once(self.project_age.as_str()))
            .chain(std::iter::once(self.users_count.as_str()))
            .chain(dao)
            .filter(|tag| !tag.trim().is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Application joined with its features, as consumed by the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedApplication {
    #[serde(flatten)]
    pub application: Application,
    pub ref_id: String,
    pub features: Features,
    pub tags: Vec<String>,
}

impl EnrichedApplication {
    pub fn new(application: Application, features: Features) -> Self {
        let ref_id = application.ref_id();
        let tags = features.searchable_tags();
        Self {
            application,
            ref_id,
            features,
            tags,
        }
    }

    pub fn title(&self) -> &str {
        self.application.title()
    }
}
