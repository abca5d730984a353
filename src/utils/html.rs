use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Whitelist-based sanitization: safe tags (<b>, <p>, ...) survive, dangerous
/// tags (<script>, <iframe>) and attributes (onclick) are stripped. Post
/// content is stored as rich HTML and rendered by the frontend, so everything
/// written through create/update passes through here first.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
