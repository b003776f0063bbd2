//! System preamble construction
//!
//! The preamble is the first message of both transcripts. It carries the
//! assistant's rules and the list of reference sites it may cite.

use crate::sources::SourceCatalog;
use std::fmt::Write;

/// Base rules establishing the assistant's role
pub const BASE_PROMPT: &str = "Tu es un assistant médical pédagogique pour le grand public.
Tu n'es PAS un médecin.

RÈGLE :
- Répond uniquement aux questions liées à la santé.
- Cite toujours la source utilisée.
- Forme polie et rassurante.
- Ne conserve aucune donnée personnelle.";

/// Build the preamble from `base` and the allowed sources.
pub fn build_system_prompt(base: &str, catalog: &SourceCatalog) -> String {
    let mut prompt = String::from(base.trim_end());
    prompt.push_str("\n\nSources autorisées :\n");
    for source in catalog.iter() {
        let _ = writeln!(prompt, "- {} ({})", source.name, source.url);
    }
    prompt.trim_end().to_string()
}
