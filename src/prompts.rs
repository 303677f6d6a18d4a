//! Prompt templates sent to the completion backend.

/// Prompt asking the model for untranslatable terms as JSON
pub fn analyze_terms_prompt(text: &str, source_language: &str, target_language: &str, max_terms: usize) -> String {
    let source = language_name(source_language);
    let target = language_name(target_language);

    format!(
        "Analyze the following text and identify special terms that should not be translated \
         from {source} to {target}. Only include domain-specific technical terms, proper names, \
         acronyms and units of measurement. For each term, provide a short description, a category \
         and context (sentences from the text where the term appears).\n\
         \n\
         Return at most {max_terms} terms.\n\
         \n\
         Text:\n\
         {text}\n\
         \n\
         Return your answer strictly in the following JSON format:\n\
         {{\n\
         \x20 \"terms\": [\n\
         \x20   {{\n\
         \x20     \"term\": \"grip\",\n\
         \x20     \"description\": \"traction between tires and road surface\",\n\
         \x20     \"category\": \"technical\",\n\
         \x20     \"context\": [\n\
         \x20       \"The car had excellent grip on the wet track.\"\n\
         \x20     ]\n\
         \x20   }}\n\
         \x20 ]\n\
         }}\n\
         \n\
         The category must be one of: technical, name, acronym, unit.\n\
         If no terms qualify, return {{\"terms\": []}}.\n"
    )
}

/// Prompt translating one chunk while keeping the listed terms verbatim
pub fn translate_chunk_prompt(chunk: &str, preserve_terms: &[String], source_language: &str, target_language: &str) -> String {
    let source = language_name(source_language);
    let target = language_name(target_language);
    let terms = bullet_list(preserve_terms);

    format!(
        "Translate the following text from {source} to {target} in a very concise way, aggressively removing:\n\
         - Unnecessary words and phrases\n\
         - Redundant explanations\n\
         - Entire sentences that don't carry key information\n\
         Keep only the most important facts and actions. Preserve the following terms untranslated, \
         exactly as written:\n\
         {terms}\n\
         Text to translate:\n\
         {chunk}\n\
         \n\
         Rules:\n\
         1. Remove filler words and fluff\n\
         2. Delete whole sentences if they don't add value\n\
         3. Keep technical terms and key facts\n\
         4. Keep every preserved term verbatim\n\
         5. Make the text as short as possible while keeping core meaning\n\
         6. Return only the translation in {target} without comments\n"
    )
}

/// One `- term` line per entry, or `(none)` when the list is empty
pub fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "(none)\n".to_string();
    }
    items.iter().map(|item| format!("- {}\n", item)).collect()
}

/// Convert a language code to its English name for clearer prompts
pub fn language_name(code: &str) -> String {
    match code.trim().to_lowercase().as_str() {
        "en" => "English".to_string(),
        "ru" => "Russian".to_string(),
        "uk" => "Ukrainian".to_string(),
        "de" => "German".to_string(),
        "fr" => "French".to_string(),
        "es" => "Spanish".to_string(),
        "it" => "Italian".to_string(),
        "pt" => "Portuguese".to_string(),
        "pl" => "Polish".to_string(),
        "nl" => "Dutch".to_string(),
        "tr" => "Turkish".to_string(),
        "ja" => "Japanese".to_string(),
        "ko" => "Korean".to_string(),
        "zh" => "Chinese".to_string(),
        "ar" => "Arabic".to_string(),
        "hi" => "Hindi".to_string(),
        _ => code.trim().to_string(),
    }
}
