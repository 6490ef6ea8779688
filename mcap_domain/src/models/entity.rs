use std::fmt::{self, Display, Formatter};
use serde::{Deserialize, Serialize};
use derivative::Derivative;

/// A tracked asset. Identity is the upstream id; the display name is informational.
#[derive(Derivative)]
#[derive(Serialize, Deserialize, Clone, Debug, Eq)]
#[derivative(Hash, PartialEq)]
pub struct Entity {
    id: String,

    #[serde(default)]
    #[derivative(PartialEq="ignore")]
    #[derivative(Hash="ignore")]
    name: String,
}

impl Entity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Entity {
        Entity { id: id.into(), name: name.into() }
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn name(&self) -> &str { &self.name }

    /// Same entity, shown under a different name.
    pub fn renamed(&self, name: impl Into<String>) -> Entity {
        Entity::new(self.id.clone(), name)
    }
}

impl Display for Entity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() || self.name == self.id {
            f.write_str(&self.id)
        } else {
            write!(f, "{} ({})", self.name, self.id)
        }
    }
}
