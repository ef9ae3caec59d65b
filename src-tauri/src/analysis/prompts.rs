//! Instructions sent to the model.

/// Exact answer the keyword analyst gives when it finds nothing worth
/// reporting. Shown to the user verbatim.
pub const NO_ANALYSIS_SENTINEL: &str = "[SEM ANÁLISE RELEVANTE]";

/// Sent next to the captured image.
pub const EXTRACT_TEXT_PROMPT: &str = "Extraia o texto da imagem.";

pub const TRANSLATOR_INSTRUCTION: &str = "\
Você é um tradutor experiente.
Você recebe um texto e o traduz para o português.
Responda somente com a tradução em português, sem formatação nem comentários.";

/// Built at runtime so the sentinel lives in one place.
pub fn keyword_instruction() -> String {
    format!(
        "Você analisa o contexto de textos.\n\
         Você recebe um texto, identifica as palavras-chave dentro desse contexto e \
         responde listando apenas essas palavras-chave.\n\
         Se encontrar alguma referência relevante ligada a elas, descreva em português \
         brasileiro os fatos relacionados.\n\
         Se não encontrar nada relevante, responda apenas \"{}\".",
        NO_ANALYSIS_SENTINEL
    )
}
