//! Lexer for ES5 source text
//!
//! Converts source text into a stream of tokens. Identifiers and string
//! literals are interned through the shared `StringDict`.

use std::iter::Peekable;
use std::str::CharIndices;

use crate::string_dict::StringDict;
use crate::value::JsString;

/// Source span information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }
}

impl Default for Span {
    fn default() -> Self {
        Self {
            start: 0,
            end: 0,
            line: 1,
            column: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(f64),
    String(JsString),
    True,
    False,
    Null,

    Identifier(JsString),

    // Keywords
    Var,
    Function,
    Return,
    If,
    Else,
    For,
    While,
    Do,
    Break,
    Continue,
    Switch,
    Case,
    Default,
    Try,
    Catch,
    Finally,
    Throw,
    New,
    This,
    Typeof,
    Instanceof,
    In,
    Void,
    Delete,
    With,
    Debugger,
    /// Future reserved word (`class`, `const`, `enum`, ...)
    Reserved(JsString),

    // Operators
    Plus,       // +
    Minus,      // -
    Star,       // *
    Slash,      // /
    Percent,    // %
    PlusPlus,   // ++
    MinusMinus, // --
    Eq,         // =
    EqEq,       // ==
    EqEqEq,     // ===
    BangEq,     // !=
    BangEqEq,   // !==
    Lt,         // <
    LtEq,       // <=
    Gt,         // >
    GtEq,       // >=
    LtLt,       // <<
    GtGt,       // >>
    GtGtGt,     // >>>
    Amp,        // &
    AmpAmp,     // &&
    Pipe,       // |
    PipePipe,   // ||
    Caret,      // ^
    Tilde,      // ~
    Bang,       // !
    Question,   // ?

    // Compound assignment
    PlusEq,     // +=
    MinusEq,    // -=
    StarEq,     // *=
    SlashEq,    // /=
    PercentEq,  // %=
    LtLtEq,     // <<=
    GtGtEq,     // >>=
    GtGtGtEq,   // >>>=
    AmpEq,      // &=
    PipeEq,     // |=
    CaretEq,    // ^=

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Dot,
    Comma,
    Colon,
    Semicolon,

    Eof,
    Invalid(char),
    UnterminatedString,
    UnterminatedComment,
}

impl TokenKind {
    /// Keywords that may still appear as property names after `.` or in
    /// object literal keys.
    pub fn keyword_text(&self) -> Option<&'static str> {
        Some(match self {
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Null => "null",
            TokenKind::Var => "var",
            TokenKind::Function => "function",
            TokenKind::Return => "return",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::For => "for",
            TokenKind::While => "while",
            TokenKind::Do => "do",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Switch => "switch",
            TokenKind::Case => "case",
            TokenKind::Default => "default",
            TokenKind::Try => "try",
            TokenKind::Catch => "catch",
            TokenKind::Finally => "finally",
            TokenKind::Throw => "throw",
            TokenKind::New => "new",
            TokenKind::This => "this",
            TokenKind::Typeof => "typeof",
            TokenKind::Instanceof => "instanceof",
            TokenKind::In => "in",
            TokenKind::Void => "void",
            TokenKind::Delete => "delete",
            TokenKind::With => "with",
            TokenKind::Debugger => "debugger",
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn eof(pos: usize, line: u32, column: u32) -> Self {
        Self {
            kind: TokenKind::Eof,
            span: Span::new(pos, pos, line, column),
        }
    }
}

#[derive(Clone)]
pub struct LexerCheckpoint {
    current_pos: usize,
    line: u32,
    column: u32,
    saw_newline: bool,
}

pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    /// Offset of `chars` within `source` after a restore
    chars_base_offset: usize,
    current_pos: usize,
    line: u32,
    column: u32,
    start_pos: usize,
    start_line: u32,
    start_column: u32,
    /// A line terminator preceded the current token (for ASI)
    saw_newline: bool,
    string_dict: &'a mut StringDict,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, string_dict: &'a mut StringDict) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            chars_base_offset: 0,
            current_pos: 0,
            line: 1,
            column: 1,
            start_pos: 0,
            start_line: 1,
            start_column: 1,
            saw_newline: false,
            string_dict,
        }
    }

    pub fn string_dict(&mut self) -> &mut StringDict {
        self.string_dict
    }

    /// Create a checkpoint of the current lexer state for backtracking
    pub fn checkpoint(&self) -> LexerCheckpoint {
        LexerCheckpoint {
            current_pos: self.current_pos,
            line: self.line,
            column: self.column,
            saw_newline: self.saw_newline,
        }
    }

    pub fn restore(&mut self, checkpoint: LexerCheckpoint) {
        self.current_pos = checkpoint.current_pos;
        self.line = checkpoint.line;
        self.column = checkpoint.column;
        self.saw_newline = checkpoint.saw_newline;
        self.chars_base_offset = checkpoint.current_pos;
        self.chars = self
            .source
            .get(checkpoint.current_pos..)
            .unwrap_or("")
            .char_indices()
            .peekable();
    }

    pub fn next_token(&mut self) -> Token {
        if let Err(kind) = self.skip_whitespace_and_comments() {
            return Token::new(kind, self.make_span());
        }

        self.start_pos = self.current_pos;
        self.start_line = self.line;
        self.start_column = self.column;

        let Some((_pos, ch)) = self.advance() else {
            return Token::eof(self.current_pos, self.line, self.column);
        };

        let kind = match ch {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            ':' => TokenKind::Colon,
            '~' => TokenKind::Tilde,
            '?' => TokenKind::Question,

            '.' => {
                if matches!(self.peek(), Some('0'..='9')) {
                    self.scan_number('.')
                } else {
                    TokenKind::Dot
                }
            }
            '+' => self.scan_operator(TokenKind::Plus, Some(TokenKind::PlusPlus), TokenKind::PlusEq, '+'),
            '-' => self.scan_operator(TokenKind::Minus, Some(TokenKind::MinusMinus), TokenKind::MinusEq, '-'),
            '&' => self.scan_operator(TokenKind::Amp, Some(TokenKind::AmpAmp), TokenKind::AmpEq, '&'),
            '|' => self.scan_operator(TokenKind::Pipe, Some(TokenKind::PipePipe), TokenKind::PipeEq, '|'),
            '*' => self.scan_operator(TokenKind::Star, None, TokenKind::StarEq, '*'),
            '/' => self.scan_operator(TokenKind::Slash, None, TokenKind::SlashEq, '/'),
            '%' => self.scan_operator(TokenKind::Percent, None, TokenKind::PercentEq, '%'),
            '^' => self.scan_operator(TokenKind::Caret, None, TokenKind::CaretEq, '^'),
            '=' => self.scan_equality(TokenKind::Eq, TokenKind::EqEq, TokenKind::EqEqEq),
            '!' => self.scan_equality(TokenKind::Bang, TokenKind::BangEq, TokenKind::BangEqEq),
            '<' => self.scan_less_than(),
            '>' => self.scan_greater_than(),

            '"' | '\'' => self.scan_string(ch),

            '0'..='9' => self.scan_number(ch),

            c if is_id_start(c) => self.scan_identifier(c),
            '\\' => TokenKind::Invalid('\\'),

            c => TokenKind::Invalid(c),
        };

        Token::new(kind, self.make_span())
    }

    /// Check if there was a newline before the current token
    pub fn had_newline_before(&self) -> bool {
        self.saw_newline
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        let result = self.chars.next();
        if let Some((pos, ch)) = result {
            self.current_pos = self.chars_base_offset + pos + ch.len_utf8();
            if is_line_terminator(ch) {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        result
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn peek_next(&self) -> Option<char> {
        let slice = self.source.get(self.current_pos..)?;
        let mut iter = slice.chars();
        iter.next();
        iter.next()
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn make_span(&self) -> Span {
        Span::new(
            self.start_pos,
            self.current_pos,
            self.start_line,
            self.start_column,
        )
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), TokenKind> {
        self.saw_newline = false;

        loop {
            match self.peek() {
                Some(' ' | '\t' | '\r' | '\u{000B}' | '\u{000C}' | '\u{00A0}' | '\u{FEFF}') => {
                    self.advance();
                }
                Some(c) if is_line_terminator(c) => {
                    self.saw_newline = true;
                    self.advance();
                }
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') => match self.peek_next() {
                    Some('/') => {
                        self.advance();
                        self.advance();
                        while let Some(ch) = self.peek() {
                            if is_line_terminator(ch) {
                                break;
                            }
                            self.advance();
                        }
                    }
                    Some('*') => {
                        self.start_pos = self.current_pos;
                        self.start_line = self.line;
                        self.start_column = self.column;
                        self.advance();
                        self.advance();
                        loop {
                            match self.advance() {
                                Some((_, '*')) if self.peek() == Some('/') => {
                                    self.advance();
                                    break;
                                }
                                Some((_, c)) if is_line_terminator(c) => {
                                    self.saw_newline = true;
                                }
                                Some(_) => {}
                                None => return Err(TokenKind::UnterminatedComment),
                            }
                        }
                    }
                    _ => break,
                },
                _ => break,
            }
        }
        Ok(())
    }

    /// `op`, `opop` (when doubled) or `op=`.
    fn scan_operator(
        &mut self,
        single: TokenKind,
        doubled: Option<TokenKind>,
        assign: TokenKind,
        ch: char,
    ) -> TokenKind {
        if let Some(doubled) = doubled {
            if self.match_char(ch) {
                return doubled;
            }
        }
        if self.match_char('=') {
            assign
        } else {
            single
        }
    }

    fn scan_equality(&mut self, single: TokenKind, eq: TokenKind, strict: TokenKind) -> TokenKind {
        if self.match_char('=') {
            if self.match_char('=') { strict } else { eq }
        } else {
            single
        }
    }

    fn scan_less_than(&mut self) -> TokenKind {
        if self.match_char('<') {
            if self.match_char('=') {
                TokenKind::LtLtEq
            } else {
                TokenKind::LtLt
            }
        } else if self.match_char('=') {
            TokenKind::LtEq
        } else {
            TokenKind::Lt
        }
    }

    fn scan_greater_than(&mut self) -> TokenKind {
        if self.match_char('>') {
            if self.match_char('>') {
                if self.match_char('=') {
                    TokenKind::GtGtGtEq
                } else {
                    TokenKind::GtGtGt
                }
            } else if self.match_char('=') {
                TokenKind::GtGtEq
            } else {
                TokenKind::GtGt
            }
        } else if self.match_char('=') {
            TokenKind::GtEq
        } else {
            TokenKind::Gt
        }
    }

    fn scan_string(&mut self, quote: char) -> TokenKind {
        let mut value = String::new();

        loop {
            match self.advance() {
                Some((_, c)) if c == quote => break,
                Some((_, '\\')) => match self.advance() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 'r')) => value.push('\r'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, 'b')) => value.push('\x08'),
                    Some((_, 'f')) => value.push('\x0C'),
                    Some((_, 'v')) => value.push('\x0B'),
                    Some((_, '0')) if !matches!(self.peek(), Some('0'..='9')) => value.push('\0'),
                    Some((_, 'x')) => match self.scan_hex_escape(2).and_then(char::from_u32) {
                        Some(ch) => value.push(ch),
                        None => return TokenKind::Invalid('x'),
                    },
                    Some((_, 'u')) => {
                        match self.scan_hex_escape(4) {
                            // Lone surrogates cannot be held in a Rust string
                            Some(code) => value.push(char::from_u32(code).unwrap_or('\u{FFFD}')),
                            None => return TokenKind::Invalid('u'),
                        }
                    }
                    Some((_, '\r')) => {
                        self.match_char('\n');
                    }
                    Some((_, c)) if is_line_terminator(c) => {}
                    Some((_, c)) => value.push(c),
                    None => return TokenKind::UnterminatedString,
                },
                Some((_, c)) if is_line_terminator(c) => return TokenKind::UnterminatedString,
                Some((_, c)) => value.push(c),
                None => return TokenKind::UnterminatedString,
            }
        }

        TokenKind::String(self.string_dict.get_or_insert(&value))
    }

    fn scan_hex_escape(&mut self, count: usize) -> Option<u32> {
        let mut code = 0;
        for _ in 0..count {
            let digit = self.peek()?.to_digit(16)?;
            self.advance();
            code = code * 16 + digit;
        }
        Some(code)
    }

    fn scan_number(&mut self, first: char) -> TokenKind {
        if first == '0' && matches!(self.peek(), Some('x' | 'X')) {
            self.advance();
            let mut value = 0.0;
            let mut digits = 0;
            while let Some(d) = self.peek().and_then(|c| c.to_digit(16)) {
                value = value * 16.0 + f64::from(d);
                digits += 1;
                self.advance();
            }
            if digits == 0 {
                return TokenKind::Invalid('x');
            }
            return self.finish_number(value);
        }

        let mut num_str = String::new();
        if first == '.' {
            num_str.push('0');
        }
        num_str.push(first);

        self.scan_digits(&mut num_str);
        if first != '.' && self.peek() == Some('.') {
            self.advance();
            num_str.push('.');
            self.scan_digits(&mut num_str);
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            let has_digits = match self.peek_next() {
                Some('0'..='9') => true,
                Some('+' | '-') => {
                    let rest = self.source.get(self.current_pos..).unwrap_or("");
                    matches!(rest.chars().nth(2), Some('0'..='9'))
                }
                _ => false,
            };
            if !has_digits {
                return TokenKind::Invalid('e');
            }
            self.advance();
            num_str.push('e');
            if let Some(sign @ ('+' | '-')) = self.peek() {
                self.advance();
                num_str.push(sign);
            }
            self.scan_digits(&mut num_str);
        }

        match num_str.parse::<f64>() {
            Ok(value) => self.finish_number(value),
            Err(_) => TokenKind::Invalid(first),
        }
    }

    fn scan_digits(&mut self, out: &mut String) {
        while let Some(ch) = self.peek() {
            if !ch.is_ascii_digit() {
                break;
            }
            out.push(ch);
            self.advance();
        }
    }

    /// A numeric literal must not run straight into an identifier.
    fn finish_number(&mut self, value: f64) -> TokenKind {
        match self.peek() {
            Some(c) if is_id_start(c) || c.is_ascii_digit() => TokenKind::Invalid(c),
            _ => TokenKind::Number(value),
        }
    }

    fn scan_identifier(&mut self, first: char) -> TokenKind {
        let mut name = String::new();
        name.push(first);

        while let Some(ch) = self.peek() {
            if is_id_continue(ch) {
                name.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match name.as_str() {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,

            "var" => TokenKind::Var,
            "function" => TokenKind::Function,
            "return" => TokenKind::Return,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "while" => TokenKind::While,
            "do" => TokenKind::Do,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "switch" => TokenKind::Switch,
            "case" => TokenKind::Case,
            "default" => TokenKind::Default,
            "try" => TokenKind::Try,
            "catch" => TokenKind::Catch,
            "finally" => TokenKind::Finally,
            "throw" => TokenKind::Throw,
            "new" => TokenKind::New,
            "this" => TokenKind::This,
            "typeof" => TokenKind::Typeof,
            "instanceof" => TokenKind::Instanceof,
            "in" => TokenKind::In,
            "void" => TokenKind::Void,
            "delete" => TokenKind::Delete,
            "with" => TokenKind::With,
            "debugger" => TokenKind::Debugger,

            "class" | "const" | "enum" | "export" | "extends" | "import" | "super" => {
                TokenKind::Reserved(self.string_dict.get_or_insert(&name))
            }

            _ => TokenKind::Identifier(self.string_dict.get_or_insert(&name)),
        }
    }
}

fn is_line_terminator(ch: char) -> bool {
    matches!(ch, '\n' | '\u{2028}' | '\u{2029}')
}

/// Check if a character can start an identifier
fn is_id_start(ch: char) -> bool {
    ch == '_' || ch == '$' || unicode_xid::UnicodeXID::is_xid_start(ch)
}

/// Check if a character can continue an identifier
fn is_id_continue(ch: char) -> bool {
    ch == '_' || ch == '$' || unicode_xid::UnicodeXID::is_xid_continue(ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<TokenKind> {
        let mut dict = StringDict::new();
        let mut lexer = Lexer::new(source, &mut dict);
        let mut tokens = vec![];
        loop {
            let token = lexer.next_token();
            if token.kind == TokenKind::Eof {
                break;
            }
            tokens.push(token.kind);
        }
        tokens
    }

    #[test]
    fn numbers() {
        assert_eq!(lex("42"), vec![TokenKind::Number(42.0)]);
        assert_eq!(lex(".5"), vec![TokenKind::Number(0.5)]);
        assert_eq!(lex("1.5e3"), vec![TokenKind::Number(1500.0)]);
        assert_eq!(lex("0xff"), vec![TokenKind::Number(255.0)]);
        assert_eq!(lex("1."), vec![TokenKind::Number(1.0)]);
        assert_eq!(lex("3in"), vec![TokenKind::Invalid('i'), TokenKind::In]);
    }

    #[test]
    fn strings_and_escapes() {
        assert_eq!(
            lex(r#"'a\tb' "\x41B""#),
            vec![
                TokenKind::String(JsString::from("a\tb")),
                TokenKind::String(JsString::from("AB")),
            ]
        );
        assert_eq!(lex("'abc"), vec![TokenKind::UnterminatedString]);
    }

    #[test]
    fn longest_operator_wins() {
        assert_eq!(
            lex(">>>= >>> >>= === !== <<="),
            vec![
                TokenKind::GtGtGtEq,
                TokenKind::GtGtGt,
                TokenKind::GtGtEq,
                TokenKind::EqEqEq,
                TokenKind::BangEqEq,
                TokenKind::LtLtEq,
            ]
        );
        assert_eq!(
            lex("a++ + ++b"),
            vec![
                TokenKind::Identifier(JsString::from("a")),
                TokenKind::PlusPlus,
                TokenKind::Plus,
                TokenKind::PlusPlus,
                TokenKind::Identifier(JsString::from("b")),
            ]
        );
    }

    #[test]
    fn keywords_and_reserved() {
        assert_eq!(
            lex("with debugger class"),
            vec![
                TokenKind::With,
                TokenKind::Debugger,
                TokenKind::Reserved(JsString::from("class")),
            ]
        );
    }

    #[test]
    fn newline_tracking() {
        let mut dict = StringDict::new();
        let mut lexer = Lexer::new("a /* x\n */ b\nc", &mut dict);
        lexer.next_token();
        assert!(!lexer.had_newline_before());
        let b = lexer.next_token();
        assert!(lexer.had_newline_before());
        assert_eq!(b.span.line, 2);
        lexer.next_token();
        assert!(lexer.had_newline_before());
    }

    #[test]
    fn unterminated_comment() {
        assert_eq!(lex("/* open"), vec![TokenKind::UnterminatedComment]);
    }
}
