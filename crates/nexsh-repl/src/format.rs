//! Result object rendering for the interactive loop.

use nexsh_types::{Object, TypeTag, Value};

/// Where a rendered result should go.
#[derive(Debug, PartialEq, Eq)]
pub enum Rendered {
    /// Print to stdout.
    Out(String),
    /// Print to stderr.
    Err(String),
    /// Print nothing.
    Silent,
}

/// Render a result object for a human. Null results are silent, errors
/// go to stderr, bytes are summarized rather than dumped.
pub fn render(object: &Object) -> Rendered {
    if object.is_error() {
        let msg = object.error_message().unwrap_or_default();
        return Rendered::Err(format!("error: {msg}"));
    }

    match (&object.meta.tag, &object.value) {
        (TypeTag::Null, _) => Rendered::Silent,
        (_, Value::Bytes(bytes)) => Rendered::Out(format!("<{} bytes>", bytes.len())),
        (_, Value::Text(text)) if text.is_empty() => Rendered::Silent,
        (_, value) => Rendered::Out(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_silent() {
        assert_eq!(render(&Object::null()), Rendered::Silent);
    }

    #[test]
    fn errors_go_to_stderr() {
        let rendered = render(&Object::error("no such file"));
        assert_eq!(rendered, Rendered::Err("error: no such file".to_string()));
    }

    #[test]
    fn text_goes_to_stdout() {
        assert_eq!(
            render(&Object::text("hello")),
            Rendered::Out("hello".to_string())
        );
    }

    #[test]
    fn bytes_are_summarized() {
        let object = Object::from_value(Value::Bytes(vec![0u8; 16]));
        assert_eq!(render(&object), Rendered::Out("<16 bytes>".to_string()));
    }

    #[test]
    fn exit_objects_still_render() {
        assert_eq!(
            render(&Object::exit()),
            Rendered::Out("Goodbye!".to_string())
        );
    }
}
