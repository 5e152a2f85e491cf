#![no_main]

use libfuzzer_sys::fuzz_target;
use stackjs::lexer::{Lexer, TokenKind};
use stackjs::string_dict::StringDict;

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    if source.len() > 100_000 {
        return;
    }

    let mut dict = StringDict::new();
    let mut lexer = Lexer::new(source, &mut dict);

    // Consume all tokens; must terminate without panicking
    loop {
        let token = lexer.next_token();
        if matches!(token.kind, TokenKind::Eof) {
            break;
        }
    }
});
