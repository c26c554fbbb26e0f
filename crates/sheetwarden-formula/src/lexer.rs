//! Formula lexer
//!
//! Splits formula text into tokens. It knows enough Excel syntax to find
//! function calls, sheet-qualified references, structured table references
//! and external workbook qualifiers, and to reject text that cannot be a
//! formula at all. It does not build an expression tree.

use crate::error::{FormulaError, FormulaResult};

/// Error literals Excel writes into formulas, longest first
const ERROR_LITERALS: [&str; 10] = [
    "#GETTING_DATA",
    "#DIV/0!",
    "#VALUE!",
    "#SPILL!",
    "#CALC!",
    "#NULL!",
    "#NAME?",
    "#NUM!",
    "#REF!",
    "#N/A",
];

/// A sheet qualifier such as `Sheet1!`, `'My Sheet'!`, `Jan:Dec!` or
/// `[Book.xlsx]Sheet1!`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRef {
    /// External workbook part, brackets included (`[Book.xlsx]`,
    /// `C:\dir\[Book.xlsx]`)
    pub workbook: Option<String>,
    /// Sheet name (first sheet of a 3-D span)
    pub first: String,
    /// Last sheet of a 3-D span
    pub last: Option<String>,
    /// Written in single quotes
    pub quoted: bool,
}

impl SheetRef {
    fn bare(first: &str, last: Option<&str>) -> Self {
        Self {
            workbook: None,
            first: first.to_string(),
            last: last.map(str::to_string),
            quoted: false,
        }
    }

    fn from_quoted(name: &str) -> Self {
        // Path separators and brackets cannot appear in a sheet name, so a
        // quoted name holding them is a workbook-qualified reference.
        let (workbook, rest) = if name.contains(['[', ']', '\\', '/']) {
            match name.rfind(']') {
                Some(i) => (Some(name[..=i].to_string()), &name[i + 1..]),
                None => (Some(name.to_string()), ""),
            }
        } else {
            (None, name)
        };

        let (first, last) = match rest.split_once(':') {
            Some((first, last)) => (first, Some(last.to_string())),
            None => (rest, None),
        };

        Self {
            workbook,
            first: first.to_string(),
            last,
            quoted: true,
        }
    }

    /// Whether the qualifier points into another workbook
    pub fn is_external(&self) -> bool {
        self.workbook.is_some()
    }

    /// Sheet names named by this qualifier (one, or both ends of a span)
    pub fn sheets(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.first.as_str()).chain(self.last.as_deref())
    }
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(String),

    // Identifiers and references
    Identifier(String), // Function name or defined name
    CellRef(String),    // Cell reference like A1, $A$1
    SheetRef(SheetRef), // Sheet qualifier, '!' consumed
    StructuredRef(String),
    ExternalWorkbook(String), // `[Book.xlsx]` not followed by a sheet name

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
    Ampersand,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Colon,
    Comma,
    Semicolon,
    Pipe,
    At,
    Hash,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
}

/// Split a formula body (without the leading `=`) into tokens
///
/// ```
/// use sheetwarden_formula::lexer::{tokenize, Token};
///
/// let tokens = tokenize("SUM(A1:A3)").unwrap();
/// assert_eq!(tokens[0], Token::Identifier("SUM".into()));
/// assert_eq!(tokens.len(), 6);
/// assert!(tokenize("\"unterminated").is_err());
/// ```
pub fn tokenize(input: &str) -> FormulaResult<Vec<Token>> {
    Lexer::new(input).run()
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    tokens: Vec<Token>,
    /// Byte offset where the previous token ended
    last_end: Option<usize>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            tokens: Vec::new(),
            last_end: None,
        }
    }

    fn run(mut self) -> FormulaResult<Vec<Token>> {
        loop {
            self.skip_whitespace();
            if self.is_at_end() {
                break;
            }

            let adjacent = self.last_end == Some(self.pos);
            let token = self.scan_token(adjacent)?;
            self.push(token, adjacent);
            self.last_end = Some(self.pos);
        }
        Ok(self.tokens)
    }

    fn push(&mut self, token: Token, adjacent: bool) {
        let token = match token {
            // `[Book.xlsx]` directly followed by `Sheet1!`
            Token::SheetRef(mut sheet) if adjacent && sheet.workbook.is_none() => {
                if matches!(self.tokens.last(), Some(Token::ExternalWorkbook(_))) {
                    if let Some(Token::ExternalWorkbook(book)) = self.tokens.pop() {
                        sheet.workbook = Some(book);
                    }
                }
                Token::SheetRef(sheet)
            }
            other => other,
        };
        self.tokens.push(token);
    }

    // === Token scanning ===

    fn scan_token(&mut self, adjacent: bool) -> FormulaResult<Token> {
        let c = match self.peek_char() {
            Some(c) => c,
            None => return Err(FormulaError::Malformed("unexpected end of input".into())),
        };

        match c {
            '+' => self.single(Token::Plus),
            '-' => self.single(Token::Minus),
            '*' => self.single(Token::Star),
            '/' => self.single(Token::Slash),
            '^' => self.single(Token::Caret),
            '%' => self.single(Token::Percent),
            '&' => self.single(Token::Ampersand),
            ':' => self.single(Token::Colon),
            ',' => self.single(Token::Comma),
            ';' => self.single(Token::Semicolon),
            '|' => self.single(Token::Pipe),
            '@' => self.single(Token::At),
            '(' => self.single(Token::LeftParen),
            ')' => self.single(Token::RightParen),
            '{' => self.single(Token::LeftBrace),
            '}' => self.single(Token::RightBrace),
            '=' => self.single(Token::Equal),
            '<' => {
                self.advance();
                match self.peek_char() {
                    Some('=') => self.single(Token::LessEqual),
                    Some('>') => self.single(Token::NotEqual),
                    _ => Ok(Token::LessThan),
                }
            }
            '>' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.single(Token::GreaterEqual)
                } else {
                    Ok(Token::GreaterThan)
                }
            }
            '"' => self.scan_string(),
            '\'' => self.scan_quoted_sheet(),
            '[' => self.scan_bracket(adjacent),
            '#' => self.scan_hash(),
            c if c.is_ascii_digit()
                || (c == '.' && self.peek_char_at(1).is_some_and(|d| d.is_ascii_digit())) =>
            {
                self.scan_number()
            }
            c if is_name_start(c) => Ok(self.scan_identifier_or_ref()),
            c => Err(FormulaError::Malformed(format!(
                "unexpected character '{}' at position {}",
                c, self.pos
            ))),
        }
    }

    fn single(&mut self, token: Token) -> FormulaResult<Token> {
        self.advance();
        Ok(token)
    }

    fn scan_string(&mut self) -> FormulaResult<Token> {
        let start = self.pos;
        self.advance(); // Skip opening quote

        let mut s = String::new();
        loop {
            match self.peek_char() {
                None => {
                    return Err(FormulaError::Malformed(format!(
                        "unterminated string starting at position {}",
                        start
                    )))
                }
                Some('"') if self.peek_char_at(1) == Some('"') => {
                    // Escaped quote ("")
                    s.push('"');
                    self.advance();
                    self.advance();
                }
                Some('"') => {
                    self.advance();
                    return Ok(Token::Text(s));
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
            }
        }
    }

    fn scan_quoted_sheet(&mut self) -> FormulaResult<Token> {
        let start = self.pos;
        self.advance(); // Skip opening quote

        let mut name = String::new();
        loop {
            match self.peek_char() {
                None => {
                    return Err(FormulaError::Malformed(format!(
                        "unterminated quoted sheet name starting at position {}",
                        start
                    )))
                }
                Some('\'') if self.peek_char_at(1) == Some('\'') => {
                    name.push('\'');
                    self.advance();
                    self.advance();
                }
                Some('\'') => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    name.push(c);
                    self.advance();
                }
            }
        }

        if name.is_empty() {
            return Err(FormulaError::Malformed(format!(
                "empty quoted sheet name at position {}",
                start
            )));
        }
        if self.peek_char() != Some('!') {
            return Err(FormulaError::Malformed(format!(
                "quoted name '{}' is not followed by '!'",
                name
            )));
        }
        self.advance();

        Ok(Token::SheetRef(SheetRef::from_quoted(&name)))
    }

    fn scan_bracket(&mut self, adjacent: bool) -> FormulaResult<Token> {
        let structured = (adjacent && matches!(self.tokens.last(), Some(Token::Identifier(_))))
            || matches!(self.peek_char_at(1), Some('@' | '#' | '['));

        if structured {
            self.scan_structured()
        } else {
            self.scan_workbook_qualifier()
        }
    }

    /// `Table1[Col]`, `[@Col]`, `Table1[[#This Row],[Col]]`
    fn scan_structured(&mut self) -> FormulaResult<Token> {
        let start = self.pos;
        let mut depth = 0usize;

        loop {
            match self.peek_char() {
                None => {
                    return Err(FormulaError::Malformed(format!(
                        "unterminated structured reference starting at position {}",
                        start
                    )))
                }
                // Apostrophe escapes the next character inside column names
                Some('\'') => {
                    self.advance();
                    self.advance();
                }
                Some('[') => {
                    depth += 1;
                    self.advance();
                }
                Some(']') => {
                    depth -= 1;
                    self.advance();
                    if depth == 0 {
                        break;
                    }
                }
                Some(_) => self.advance(),
            }
        }

        Ok(Token::StructuredRef(self.input[start..self.pos].to_string()))
    }

    /// `[Book.xlsx]` or `[1]` ahead of a sheet or defined name
    fn scan_workbook_qualifier(&mut self) -> FormulaResult<Token> {
        let start = self.pos;
        self.advance(); // Skip '['

        loop {
            match self.peek_char() {
                None | Some('[') => {
                    return Err(FormulaError::Malformed(format!(
                        "unbalanced '[' at position {}",
                        start
                    )))
                }
                Some(']') => {
                    self.advance();
                    break;
                }
                Some(_) => self.advance(),
            }
        }

        let text = &self.input[start..self.pos];
        if text == "[]" {
            return Err(FormulaError::Malformed(format!(
                "empty brackets at position {}",
                start
            )));
        }
        Ok(Token::ExternalWorkbook(text.to_string()))
    }

    fn scan_hash(&mut self) -> FormulaResult<Token> {
        let rest = &self.input[self.pos..];
        for literal in ERROR_LITERALS {
            if rest
                .get(..literal.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(literal))
            {
                self.pos += literal.len();
                return Ok(Token::Error(literal.to_string()));
            }
        }

        if self.peek_char_at(1).is_some_and(|c| c.is_ascii_alphabetic()) {
            return Err(FormulaError::Malformed(format!(
                "unknown error literal at position {}",
                self.pos
            )));
        }

        // Spill range operator (A1#)
        self.single(Token::Hash)
    }

    fn scan_number(&mut self) -> FormulaResult<Token> {
        let start = self.pos;

        // Integer part
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        // Decimal part
        if self.peek_char() == Some('.') {
            self.advance();
            while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        // Exponent part
        if self.peek_char().is_some_and(|c| c == 'e' || c == 'E') {
            self.advance();
            if self.peek_char().is_some_and(|c| c == '+' || c == '-') {
                self.advance();
            }
            while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let num_str = &self.input[start..self.pos];
        num_str
            .parse::<f64>()
            .map(Token::Number)
            .map_err(|_| FormulaError::Malformed(format!("invalid number '{}'", num_str)))
    }

    fn scan_identifier_or_ref(&mut self) -> Token {
        let start = self.pos;

        while self.peek_char().is_some_and(is_name_char) {
            self.advance();
        }

        let text = &self.input[start..self.pos];

        match self.peek_char() {
            // Sheet reference (ends with !)
            Some('!') => {
                self.advance();
                return Token::SheetRef(SheetRef::bare(text, None));
            }
            // 3-D sheet span (Jan:Dec!)
            Some(':') => {
                if let Some(end) = self.span_end() {
                    let last = &self.input[self.pos + 1..end];
                    let sheet = SheetRef::bare(text, Some(last));
                    self.pos = end + 1;
                    return Token::SheetRef(sheet);
                }
            }
            // Table name ahead of a structured reference
            Some('[') => return Token::Identifier(text.to_string()),
            _ => {}
        }

        // Booleans, unless called as a function
        let upper = text.to_uppercase();
        if upper == "TRUE" && self.peek_char() != Some('(') {
            return Token::Boolean(true);
        }
        if upper == "FALSE" && self.peek_char() != Some('(') {
            return Token::Boolean(false);
        }

        // LOG10(100) is a function call, not a cell reference
        if is_cell_reference(text) && self.peek_char() != Some('(') {
            return Token::CellRef(text.to_string());
        }

        Token::Identifier(text.to_string())
    }

    /// With the cursor on ':', the byte offset of the '!' closing a sheet span
    fn span_end(&self) -> Option<usize> {
        let after_colon = self.pos + 1;
        let rest = self.input.get(after_colon..)?;
        let len: usize = rest
            .chars()
            .take_while(|c| is_name_char(*c))
            .map(char::len_utf8)
            .sum();
        (len > 0 && rest[len..].starts_with('!')).then_some(after_colon + len)
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$' || c == '\\'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '$' | '.' | '\\')
}

/// `[$]letters[$]digits`, without checking sheet limits
fn is_cell_reference(text: &str) -> bool {
    let rest = text.strip_prefix('$').unwrap_or(text);
    let letters = rest.bytes().take_while(u8::is_ascii_alphabetic).count();
    if letters == 0 {
        return false;
    }
    let rest = &rest[letters..];
    let rest = rest.strip_prefix('$').unwrap_or(rest);
    !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sheet(token: &Token) -> &SheetRef {
        match token {
            Token::SheetRef(s) => s,
            other => panic!("expected sheet ref, got {:?}", other),
        }
    }

    #[test]
    fn test_simple_tokens() {
        assert_eq!(
            tokenize("1+A1*2").unwrap(),
            vec![
                Token::Number(1.0),
                Token::Plus,
                Token::CellRef("A1".into()),
                Token::Star,
                Token::Number(2.0),
            ]
        );
        assert_eq!(
            tokenize("A1<>B1").unwrap()[1],
            Token::NotEqual
        );
    }

    #[test]
    fn test_string_escape() {
        assert_eq!(
            tokenize("\"Hello \"\"World\"\"\"").unwrap(),
            vec![Token::Text("Hello \"World\"".into())]
        );
    }

    #[test]
    fn test_function_vs_cell() {
        let tokens = tokenize("LOG10(100)").unwrap();
        assert_eq!(tokens[0], Token::Identifier("LOG10".into()));
        let tokens = tokenize("$B$2").unwrap();
        assert_eq!(tokens[0], Token::CellRef("$B$2".into()));
        let tokens = tokenize("_xlfn.WEBSERVICE(\"x\")").unwrap();
        assert_eq!(tokens[0], Token::Identifier("_xlfn.WEBSERVICE".into()));
    }

    #[test]
    fn test_sheet_refs() {
        let tokens = tokenize("Assumptions!B2*'Income Statement'!C4").unwrap();
        assert_eq!(sheet(&tokens[0]).first, "Assumptions");
        assert!(!sheet(&tokens[0]).quoted);
        assert_eq!(sheet(&tokens[3]).first, "Income Statement");
        assert!(sheet(&tokens[3]).quoted);

        let tokens = tokenize("'It''s'!A1").unwrap();
        assert_eq!(sheet(&tokens[0]).first, "It's");
    }

    #[test]
    fn test_three_d_span() {
        let tokens = tokenize("SUM(Jan:Dec!B2)").unwrap();
        let span = sheet(&tokens[2]);
        assert_eq!(span.sheets().collect::<Vec<_>>(), vec!["Jan", "Dec"]);

        let tokens = tokenize("SUM('Q 1:Q 4'!B2)").unwrap();
        let span = sheet(&tokens[2]);
        assert_eq!(span.first, "Q 1");
        assert_eq!(span.last.as_deref(), Some("Q 4"));

        // An ordinary range is not a span
        let tokens = tokenize("A1:B2").unwrap();
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn test_external_workbook() {
        let tokens = tokenize("[Book.xlsx]Sheet1!A1").unwrap();
        let ext = sheet(&tokens[0]);
        assert_eq!(ext.workbook.as_deref(), Some("[Book.xlsx]"));
        assert_eq!(ext.first, "Sheet1");

        let tokens = tokenize("'C:\\dir\\[Book.xlsx]Data'!A1").unwrap();
        let ext = sheet(&tokens[0]);
        assert_eq!(ext.workbook.as_deref(), Some("C:\\dir\\[Book.xlsx]"));
        assert_eq!(ext.first, "Data");

        let tokens = tokenize("[1]Rates").unwrap();
        assert_eq!(tokens[0], Token::ExternalWorkbook("[1]".into()));
    }

    #[test]
    fn test_structured_refs() {
        let tokens = tokenize("SUM(Sales[Amount])").unwrap();
        assert_eq!(tokens[2], Token::Identifier("Sales".into()));
        assert_eq!(tokens[3], Token::StructuredRef("[Amount]".into()));

        let tokens = tokenize("[@Qty]*[@Price]").unwrap();
        assert_eq!(tokens[0], Token::StructuredRef("[@Qty]".into()));

        let tokens = tokenize("Sales[[#This Row],[Net '[USD']]]").unwrap();
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn test_error_literals_and_spill() {
        assert_eq!(
            tokenize("#REF!A1").unwrap(),
            vec![Token::Error("#REF!".into()), Token::CellRef("A1".into())]
        );
        assert_eq!(tokenize("#n/a").unwrap(), vec![Token::Error("#N/A".into())]);
        assert_eq!(
            tokenize("A1#").unwrap(),
            vec![Token::CellRef("A1".into()), Token::Hash]
        );
        assert!(tokenize("#BOGUS!").is_err());
    }

    #[test]
    fn test_malformed() {
        for bad in ["\"open", "'Sheet1!A1", "'Sheet1'A1", "''!A1", "[Book.xlsx", "Sales[Amount", "1~2", "1e"] {
            assert!(
                matches!(tokenize(bad), Err(FormulaError::Malformed(_))),
                "expected '{}' to be malformed",
                bad
            );
        }
    }

    #[test]
    fn test_dde_pipe() {
        let tokens = tokenize("cmd|'/c calc'!A0").unwrap();
        assert_eq!(tokens[1], Token::Pipe);
        assert!(sheet(&tokens[2]).is_external());
    }
}
