//! Treatment recommendation catalog
//!
//! Static label → recommendation lookup plus the per-disease info sheets
//! served by `/api/diseases`. `recommendation_for` is total: labels outside
//! the known set get the generic consult-an-expert text.

use serde::Serialize;

/// Fallback text for labels outside the catalog
pub const GENERIC_ADVICE: &str =
    "Consult with agricultural expert for treatment advice.";

/// Treatment recommendation for a predicted label. Total function.
pub fn recommendation_for(label: &str) -> &'static str {
    match label {
        "Healthy" => {
            "Continue regular maintenance and monitoring. Follow good agricultural \
             practices for disease prevention."
        }
        "Anthracnose" => {
            "Apply copper-based fungicides or propiconazole. Remove infected fruits \
             and maintain proper sanitation. Prune for better air circulation."
        }
        "Bacterial_Canker" => {
            "Use copper-based bactericides. Prune infected branches and improve air \
             circulation."
        }
        "Cutting_Weevil" => {
            "Apply appropriate insecticides. Remove fallen fruits and maintain a \
             clean orchard."
        }
        "Die_Back" => {
            "Prune infected branches. Apply fungicides and improve drainage."
        }
        "Gall_Midge" => {
            "Use systemic insecticides. Remove infected flowers and fruits."
        }
        "Powdery_Mildew" => {
            "Apply sulfur-based fungicides. Ensure good air circulation."
        }
        "Sooty_Mould" => {
            "Control honeydew-producing insects. Apply fungicides if necessary."
        }
        // Alternate model revisions ship these labels
        "Alternaria" => {
            "Apply copper-based or mancozeb fungicides. Remove infected leaves and \
             fruits. Ensure proper air circulation and avoid overhead watering."
        }
        "Black_Mould_Rot" | "Black Mould Rot" => {
            "Improve storage conditions with proper ventilation. Apply post-harvest \
             fungicides. Handle fruits carefully to avoid wounds."
        }
        "Stem_and_Rot" | "Stem and Rot" => {
            "Apply systemic fungicides like carbendazim. Remove infected plant \
             parts. Improve drainage and avoid waterlogging."
        }
        _ => GENERIC_ADVICE,
    }
}

/// Info sheet for one disease class
#[derive(Debug, Clone, Serialize)]
pub struct DiseaseInfo {
    pub name: &'static str,
    pub symptoms: &'static str,
    pub treatment: &'static str,
    pub severity: &'static str,
    pub prevention: &'static str,
}

/// Full info sheet for a class label; unknown labels get a generic sheet.
pub fn disease_info(label: &str) -> DiseaseInfo {
    match label {
        "Healthy" => DiseaseInfo {
            name: "Healthy Plant",
            symptoms: "No visible disease symptoms, healthy green foliage",
            treatment: recommendation_for("Healthy"),
            severity: "None",
            prevention: "Continue regular maintenance and monitoring",
        },
        "Anthracnose" => DiseaseInfo {
            name: "Anthracnose",
            symptoms: "Dark, sunken spots on fruits and leaves, pink spore masses",
            treatment: recommendation_for("Anthracnose"),
            severity: "High",
            prevention: "Proper air circulation, remove infected debris",
        },
        "Bacterial_Canker" => DiseaseInfo {
            name: "Bacterial Canker",
            symptoms: "Water-soaked lesions on leaves, raised cracked cankers on stems",
            treatment: recommendation_for("Bacterial_Canker"),
            severity: "High",
            prevention: "Disinfect pruning tools, prune during dry weather",
        },
        "Cutting_Weevil" => DiseaseInfo {
            name: "Cutting Weevil",
            symptoms: "Severed young shoots and leaves, visible feeding punctures",
            treatment: recommendation_for("Cutting_Weevil"),
            severity: "Moderate",
            prevention: "Orchard sanitation, remove fallen plant material",
        },
        "Die_Back" => DiseaseInfo {
            name: "Die Back",
            symptoms: "Twigs drying from the tip downward, darkened bark",
            treatment: recommendation_for("Die_Back"),
            severity: "High",
            prevention: "Improve drainage, prune well below infected tissue",
        },
        "Gall_Midge" => DiseaseInfo {
            name: "Gall Midge",
            symptoms: "Wart-like galls on leaves, deformed inflorescences",
            treatment: recommendation_for("Gall_Midge"),
            severity: "Moderate",
            prevention: "Remove and destroy infested flowers and fruits",
        },
        "Powdery_Mildew" => DiseaseInfo {
            name: "Powdery Mildew",
            symptoms: "White powdery coating on panicles and young leaves",
            treatment: recommendation_for("Powdery_Mildew"),
            severity: "High",
            prevention: "Good air circulation, early-season sulfur sprays",
        },
        "Sooty_Mould" => DiseaseInfo {
            name: "Sooty Mould",
            symptoms: "Black sooty growth on leaf and fruit surfaces",
            treatment: recommendation_for("Sooty_Mould"),
            severity: "Moderate",
            prevention: "Control honeydew-producing insects",
        },
        _ => DiseaseInfo {
            name: "Unknown",
            symptoms: "Not cataloged",
            treatment: GENERIC_ADVICE,
            severity: "Unknown",
            prevention: "Consult an agricultural expert",
        },
    }
}
