use logos::{Lexer, Logos};

/// Numeric literal as written after `#`.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum Literal {
    Int(i32),
    Uint(u32),
    Float(f32),
}

impl Literal {
    pub fn to_word(self) -> u32 {
        match self {
            Literal::Int(v) => v as u32,
            Literal::Uint(v) => v,
            Literal::Float(v) => v.to_bits(),
        }
    }
}

#[derive(PartialEq, Debug, Clone, Logos)]
pub enum TokenKind {
    #[token("\n")]
    Newline,

    // Toplevel.
    #[regex("@[a-z]+", |lex| lex.slice()[1..].to_string())]
    Directive(String),
    #[regex(r"\.[A-Za-z]+/[a-z]+", device_call)]
    Device((String, String)),
    #[regex("_[A-Za-z0-9_]+:", |lex| { let s = lex.slice(); s[1..s.len() - 1].to_string() })]
    LabelDef(String),
    #[regex("_[A-Za-z0-9_]+", |lex| lex.slice()[1..].to_string())]
    LabelRef(String),
    #[regex("[A-Za-z]+", |lex| lex.slice().to_string())]
    Mnemonic(String),

    // Registers.
    #[regex("R[0-9]+", register)]
    General(u32),
    #[regex("S[0-9]+", register)]
    Stream(u32),
    #[regex("G[0-9]+", register)]
    Generator(u32),
    #[regex("C[0-9]+", register)]
    Consumer(u32),
    #[token("SR")]
    SampleRate,

    // Literals.
    #[regex(r"#-?([0-9]+(\.[0-9]*)?|\.[0-9]+)", literal)]
    Literal(Literal),
    #[regex(r#""[^"\n]*""#, string)]
    Str(String),

    #[error]
    #[regex(r"[ \t\r\f]+", logos::skip)]
    #[regex(r";[^\n]*", logos::skip)]
    Error,
}

fn device_call(lex: &mut Lexer<TokenKind>) -> Option<(String, String)> {
    let (device, function) = lex.slice()[1..].split_once('/')?;
    Some((device.to_string(), function.to_string()))
}

// Out-of-range numbers saturate so the parser can name the register in its error.
fn register(lex: &mut Lexer<TokenKind>) -> Option<u32> {
    Some(lex.slice()[1..].parse().unwrap_or(u32::MAX))
}

fn literal(lex: &mut Lexer<TokenKind>) -> Option<Literal> {
    let text = &lex.slice()[1..];
    if text.contains('.') {
        text.parse().ok().map(Literal::Float)
    } else if text.starts_with('-') {
        text.parse().ok().map(Literal::Int)
    } else {
        text.parse().ok().map(Literal::Uint)
    }
}

fn string(lex: &mut Lexer<TokenKind>) -> Option<String> {
    let s = lex.slice();
    Some(s[1..s.len() - 1].replace("\\n", "\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tokens(source: &str) -> Vec<TokenKind> {
        TokenKind::lexer(source).collect()
    }

    #[test]
    fn instruction_line() {
        assert_eq!(
            tokens("ADD R2 R0 R1 ; sum\n"),
            vec![
                TokenKind::Mnemonic("ADD".into()),
                TokenKind::General(2),
                TokenKind::General(0),
                TokenKind::General(1),
                TokenKind::Newline,
            ]
        );
    }

    #[test]
    fn literals() {
        assert_eq!(
            tokens("#5 #-3 #1.5 #.25 #7."),
            vec![
                TokenKind::Literal(Literal::Uint(5)),
                TokenKind::Literal(Literal::Int(-3)),
                TokenKind::Literal(Literal::Float(1.5)),
                TokenKind::Literal(Literal::Float(0.25)),
                TokenKind::Literal(Literal::Float(7.0)),
            ]
        );
        assert_eq!(tokens("#99999999999"), vec![TokenKind::Error]);
    }

    #[test]
    fn labels_and_directives() {
        assert_eq!(
            tokens("@task _main:\nJMP _x_1"),
            vec![
                TokenKind::Directive("task".into()),
                TokenKind::LabelDef("main".into()),
                TokenKind::Newline,
                TokenKind::Mnemonic("JMP".into()),
                TokenKind::LabelRef("x_1".into()),
            ]
        );
    }

    #[test]
    fn registers_and_devices() {
        assert_eq!(
            tokens(".Screen/pixel S3 G0 C31 SR SUB"),
            vec![
                TokenKind::Device(("Screen".into(), "pixel".into())),
                TokenKind::Stream(3),
                TokenKind::Generator(0),
                TokenKind::Consumer(31),
                TokenKind::SampleRate,
                TokenKind::Mnemonic("SUB".into()),
            ]
        );
    }

    #[test]
    fn strings_unescape_newlines() {
        assert_eq!(
            tokens(r#""hi\n""#),
            vec![TokenKind::Str("hi\n".into())]
        );
    }
}
