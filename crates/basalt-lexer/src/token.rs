//! Token definitions for Basalt

use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")] // Skip whitespace
#[logos(skip r"//[^\n]*")] // Skip line comments
#[logos(skip r"/\*([^*]|\*[^/])*\*/")] // Skip block comments
pub enum TokenKind {
    // === Keywords ===
    #[token("include")]
    Include,
    #[token("scope")]
    Scope,
    #[token("struct")]
    Struct,
    #[token("enum")]
    Enum,
    #[token("bitmap")]
    Bitmap,
    #[token("register")]
    Register,
    #[token("extern")]
    Extern,
    #[token("const")]
    Const,
    #[token("atomic")]
    Atomic,
    #[token("volatile")]
    Volatile,
    #[token("clamp")]
    Clamp,
    #[token("wrap")]
    Wrap,
    #[token("public")]
    Public,
    #[token("private")]
    Private,
    #[token("this")]
    This,
    #[token("global")]
    Global,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("switch")]
    Switch,
    #[token("case")]
    Case,
    #[token("default")]
    Default,
    #[token("return")]
    Return,
    #[token("critical")]
    Critical,

    // === Type keywords ===
    #[token("u8")]
    U8,
    #[token("u16")]
    U16,
    #[token("u32")]
    U32,
    #[token("u64")]
    U64,
    #[token("i8")]
    I8,
    #[token("i16")]
    I16,
    #[token("i32")]
    I32,
    #[token("i64")]
    I64,
    #[token("f32")]
    F32,
    #[token("f64")]
    F64,
    #[token("bool")]
    Bool,
    #[token("void")]
    Void,
    #[token("str")]
    Str,

    // === Literals ===
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[regex(r"0[xX][0-9a-fA-F_]+")]
    HexInt,
    #[regex(r"0[bB][01_]+")]
    BinInt,
    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*")]
    Float,
    #[regex(r"[0-9][0-9_]*")]
    Int,
    #[regex(r#""([^"\\]|\\.)*""#)]
    String,
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    // === Assignment operators ===
    #[token("<-")]
    Assign,
    #[token("+<-")]
    AddAssign,
    #[token("-<-")]
    SubAssign,
    #[token("*<-")]
    MulAssign,
    #[token("/<-")]
    DivAssign,
    #[token("%<-")]
    RemAssign,
    #[token("&<-")]
    AndAssign,
    #[token("|<-")]
    OrAssign,
    #[token("^<-")]
    XorAssign,
    #[token("<<<-")]
    ShlAssign,
    #[token(">><-")]
    ShrAssign,

    // === Operators ===
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("!")]
    Bang,
    #[token("~")]
    Tilde,
    #[token("?")]
    Question,

    // === Punctuation ===
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("@")]
    At,

    // === Special ===
    Error,
    Eof,
}

impl TokenKind {
    /// Human-readable name for error messages
    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::Include => "`include`",
            TokenKind::Scope => "`scope`",
            TokenKind::Struct => "`struct`",
            TokenKind::Enum => "`enum`",
            TokenKind::Bitmap => "`bitmap`",
            TokenKind::Register => "`register`",
            TokenKind::Extern => "`extern`",
            TokenKind::Const => "`const`",
            TokenKind::Atomic => "`atomic`",
            TokenKind::Volatile => "`volatile`",
            TokenKind::Clamp => "`clamp`",
            TokenKind::Wrap => "`wrap`",
            TokenKind::Public => "`public`",
            TokenKind::Private => "`private`",
            TokenKind::This => "`this`",
            TokenKind::Global => "`global`",
            TokenKind::If => "`if`",
            TokenKind::Else => "`else`",
            TokenKind::While => "`while`",
            TokenKind::For => "`for`",
            TokenKind::Switch => "`switch`",
            TokenKind::Case => "`case`",
            TokenKind::Default => "`default`",
            TokenKind::Return => "`return`",
            TokenKind::Critical => "`critical`",
            TokenKind::U8
            | TokenKind::U16
            | TokenKind::U32
            | TokenKind::U64
            | TokenKind::I8
            | TokenKind::I16
            | TokenKind::I32
            | TokenKind::I64
            | TokenKind::F32
            | TokenKind::F64
            | TokenKind::Bool
            | TokenKind::Void
            | TokenKind::Str => "type name",
            TokenKind::True | TokenKind::False => "boolean literal",
            TokenKind::HexInt | TokenKind::BinInt | TokenKind::Int => "integer literal",
            TokenKind::Float => "float literal",
            TokenKind::String => "string literal",
            TokenKind::Ident => "identifier",
            TokenKind::Assign => "`<-`",
            TokenKind::AddAssign
            | TokenKind::SubAssign
            | TokenKind::MulAssign
            | TokenKind::DivAssign
            | TokenKind::RemAssign
            | TokenKind::AndAssign
            | TokenKind::OrAssign
            | TokenKind::XorAssign
            | TokenKind::ShlAssign
            | TokenKind::ShrAssign => "compound assignment",
            TokenKind::Plus => "`+`",
            TokenKind::Minus => "`-`",
            TokenKind::Star => "`*`",
            TokenKind::Slash => "`/`",
            TokenKind::Percent => "`%`",
            TokenKind::Amp => "`&`",
            TokenKind::Pipe => "`|`",
            TokenKind::Caret => "`^`",
            TokenKind::Shl => "`<<`",
            TokenKind::Shr => "`>>`",
            TokenKind::EqEq => "`==`",
            TokenKind::NotEq => "`!=`",
            TokenKind::Lt => "`<`",
            TokenKind::Le => "`<=`",
            TokenKind::Gt => "`>`",
            TokenKind::Ge => "`>=`",
            TokenKind::AmpAmp => "`&&`",
            TokenKind::PipePipe => "`||`",
            TokenKind::Bang => "`!`",
            TokenKind::Tilde => "`~`",
            TokenKind::Question => "`?`",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::LBrace => "`{`",
            TokenKind::RBrace => "`}`",
            TokenKind::LBracket => "`[`",
            TokenKind::RBracket => "`]`",
            TokenKind::Comma => "`,`",
            TokenKind::Semi => "`;`",
            TokenKind::Colon => "`:`",
            TokenKind::Dot => "`.`",
            TokenKind::At => "`@`",
            TokenKind::Error => "invalid token",
            TokenKind::Eof => "end of file",
        }
    }

    pub fn is_type_start(&self) -> bool {
        matches!(
            self,
            TokenKind::U8
                | TokenKind::U16
                | TokenKind::U32
                | TokenKind::U64
                | TokenKind::I8
                | TokenKind::I16
                | TokenKind::I32
                | TokenKind::I64
                | TokenKind::F32
                | TokenKind::F64
                | TokenKind::Bool
                | TokenKind::Void
                | TokenKind::Str
        )
    }

    pub fn is_modifier(&self) -> bool {
        matches!(
            self,
            TokenKind::Const
                | TokenKind::Atomic
                | TokenKind::Volatile
                | TokenKind::Clamp
                | TokenKind::Wrap
        )
    }
}
