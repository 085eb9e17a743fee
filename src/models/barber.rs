use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Barber {
    pub id: String,
    pub name: String,
    pub bio: Option<String>,
    pub specialty: Option<String>,
    pub photo_url: Option<String>,
    pub active: bool,
}
