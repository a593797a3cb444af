/// Marks the end of a chat turn. Generation stops once the model emits it.
pub const END_OF_TURN: &str = "<end_of_turn>";

/// Wrap a single user message in Gemma's chat turn markers.
///
/// `<bos>` is added by the tokenizer.
pub fn chat_prompt(user: &str) -> String {
    format!("<start_of_turn>user\n{user}{END_OF_TURN}\n<start_of_turn>model\n")
}
