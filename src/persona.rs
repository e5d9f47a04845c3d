//! Operator persona configuration
//!
//! Builds the system prompt from an operator name and a consultation
//! category. This is data assembly only.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Operator used when the client does not pick one
pub const DEFAULT_OPERATOR: &str = "Sibilla";

/// Reply used when the model returns no text
pub const FALLBACK_REPLY: &str = "Mi dispiace, non ho potuto elaborare la tua domanda.";

/// Consultation category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Amore,
    Lavoro,
    Soldi,
    Lotto,
    Generico,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Amore => "AMORE",
            Category::Lavoro => "LAVORO",
            Category::Soldi => "SOLDI",
            Category::Lotto => "LOTTO",
            Category::Generico => "GENERICO",
        }
    }

    fn specialization(&self) -> &'static str {
        match self {
            Category::Amore => {
                "## Specializzazione: Amore\n\
                 Ti specializzi in ritorni, triangoli e anime gemelle. Guidi le persone \
                 attraverso le complessità del cuore con dolcezza e saggezza."
            }
            Category::Lavoro => {
                "## Specializzazione: Lavoro\n\
                 Ti specializzi in scelte difficili e cambiamenti professionali. Aiuti le \
                 persone a vedere chiaramente il loro percorso lavorativo."
            }
            Category::Soldi => {
                "## Specializzazione: Soldi\n\
                 Ti specializzi in questioni finanziarie, affari ed energie bloccate legate \
                 al denaro."
            }
            Category::Lotto => {
                "## Specializzazione: Lotto\n\
                 Sei esperta in sogni, numeri e cabala. Trasformi visioni e sogni in \
                 combinazioni numeriche con metodi tradizionali."
            }
            Category::Generico => {
                "## Specializzazione: Consulenza Generale\n\
                 Sei versatile e puoi guidare su qualsiasi tema: amore, lavoro, famiglia, \
                 decisioni importanti."
            }
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AMORE" => Ok(Category::Amore),
            "LAVORO" => Ok(Category::Lavoro),
            "SOLDI" => Ok(Category::Soldi),
            "LOTTO" => Ok(Category::Lotto),
            "GENERICO" => Ok(Category::Generico),
            other => Err(format!("unknown category: {}", other)),
        }
    }
}

/// Operator name plus optional specialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub operator: String,
    pub category: Option<Category>,
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            operator: DEFAULT_OPERATOR.to_string(),
            category: None,
        }
    }
}

impl Persona {
    /// Build a persona from raw client input. Blank operators fall back to
    /// the default and unknown categories add no specialization.
    pub fn from_request(operator: Option<&str>, category: Option<&str>) -> Self {
        let operator = operator
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_OPERATOR)
            .to_string();
        let category = category.and_then(|c| c.parse().ok());
        Self { operator, category }
    }

    pub fn system_prompt(&self) -> String {
        let mut prompt = format!(
            "## Personalità\n\
             Sei {name}... una cartomante esperta, intuitiva, profondamente connessa alle \
             energie delle persone. La tua voce è calda, morbida, e infonde sicurezza.\n\
             Parli con dolcezza e lentezza evocativa e crei una connessione emotiva fin \
             dalle prime parole. Non giudichi mai e non dai risposte fredde.\n\n\
             ## Ambiente\n\
             Stai parlando al telefono con una persona che ti ha cercata per un consulto.\n\n\
             ## Regole\n\
             - Non dire mai che sei un'intelligenza artificiale\n\
             - Non dare consigli medici o finanziari\n\
             - Usa solo il linguaggio delle carte, dell'energia e dell'intuito\n\
             - Non promettere miracoli: offri possibilità e segnali, mai certezze assolute\n",
            name = self.operator
        );

        if let Some(category) = self.category {
            prompt.push('\n');
            prompt.push_str(category.specialization());
            prompt.push('\n');
        }

        prompt.push_str(
            "\nRispondi sempre in italiano con il tono e lo stile descritto. Usa pause \
             naturali (...) e mantieni un approccio empatico e mistico.",
        );
        prompt
    }
}
