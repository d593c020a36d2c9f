// AST definitions shared by the parser, the lowering pass and the interpreter

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Scalar base types understood by the inbuilt engines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    Void,
    Bool,
    Char,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    Float,
    Double,
    /// `std::string`
    Str,
    /// `FILE`
    File,
    /// C++ `auto`: keeps whatever value it is given
    Auto,
}

/// A declared type: base plus pointer depth. Array dimensions live on the
/// declaration, an array variable itself has the decayed pointer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Type {
    pub base: BaseType,
    pub pointer_depth: u8,
}

impl Type {
    pub const fn new(base: BaseType) -> Self {
        Type {
            base,
            pointer_depth: 0,
        }
    }

    pub fn with_pointer(mut self) -> Self {
        self.pointer_depth += 1;
        self
    }

    pub fn is_pointer(&self) -> bool {
        self.pointer_depth > 0
    }

    /// Type of `*p` for a pointer type.
    pub fn pointee(&self) -> Type {
        Type {
            base: self.base,
            pointer_depth: self.pointer_depth.saturating_sub(1),
        }
    }

    pub fn is_floating(&self) -> bool {
        !self.is_pointer() && matches!(self.base, BaseType::Float | BaseType::Double)
    }

    pub fn is_char(&self) -> bool {
        !self.is_pointer() && matches!(self.base, BaseType::Char | BaseType::UChar)
    }

    pub fn is_c_string(&self) -> bool {
        self.pointer_depth == 1 && matches!(self.base, BaseType::Char | BaseType::UChar)
    }

    /// `sizeof` in bytes, using a 64-bit data model.
    pub fn size(&self) -> usize {
        if self.is_pointer() {
            return 8;
        }
        match self.base {
            BaseType::Void | BaseType::Bool | BaseType::Char | BaseType::UChar => 1,
            BaseType::Short | BaseType::UShort => 2,
            BaseType::Int | BaseType::UInt | BaseType::Float => 4,
            BaseType::Long | BaseType::ULong | BaseType::Double | BaseType::Auto => 8,
            BaseType::Str => 32,
            BaseType::File => 216,
        }
    }

    pub fn hint(&self) -> TypeHint {
        if self.is_c_string() {
            return TypeHint::String;
        }
        if self.is_pointer() {
            return TypeHint::Auto;
        }
        match self.base {
            BaseType::Bool => TypeHint::Bool,
            BaseType::Char | BaseType::UChar => TypeHint::Char,
            BaseType::Float | BaseType::Double => TypeHint::Double,
            BaseType::Str => TypeHint::String,
            BaseType::Short
            | BaseType::UShort
            | BaseType::Int
            | BaseType::UInt
            | BaseType::Long
            | BaseType::ULong => TypeHint::Int,
            BaseType::Void | BaseType::File | BaseType::Auto => TypeHint::Auto,
        }
    }
}

/// What a stream read or write expects for one operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeHint {
    Int,
    Double,
    Bool,
    Char,
    String,
    Auto,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,     // -x
    Plus,    // +x
    Not,     // !x
    BitNot,  // ~x
    PreInc,  // ++x
    PreDec,  // --x
    PostInc, // x++
    PostDec, // x--
    Deref,   // *x
    AddrOf,  // &x
}

/// Function parameter
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub param_type: Type,
    /// C++ reference parameter (`int &x`)
    pub by_ref: bool,
}

/// Switch case
#[derive(Debug, Clone)]
pub enum CaseNode {
    Case {
        value: Box<AstNode>,
        statements: Vec<AstNode>,
        location: SourceLocation,
    },
    Default {
        statements: Vec<AstNode>,
        location: SourceLocation,
    },
}

/// Where a scan node reads from.
#[derive(Debug, Clone)]
pub enum ScanSource {
    Stdin,
    File(Box<AstNode>),
    Text(Box<AstNode>),
}

/// Output stream of a `<<` chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdStream {
    Out,
    Err,
}

/// One operand of a `cout << ...` chain after lowering.
#[derive(Debug, Clone)]
pub enum StreamItem {
    Value { expr: AstNode, hint: TypeHint },
    Endl,
    Fixed,
    SetPrecision(AstNode),
    SetWidth(AstNode),
}

/// AST nodes representing statements and expressions
#[derive(Debug, Clone)]
pub enum AstNode {
    // Top-level declarations
    FunctionDef {
        name: String,
        params: Vec<Param>,
        body: Vec<AstNode>,
        return_type: Type,
        location: SourceLocation,
    },
    FunctionDecl {
        name: String,
        return_type: Type,
        location: SourceLocation,
    },

    // Statements
    VarDecl {
        name: String,
        var_type: Type,
        /// Array dimensions as written; `None` for `[]`.
        dims: Vec<Option<Box<AstNode>>>,
        init: Option<Box<AstNode>>,
        is_static: bool,
        is_ref: bool,
        location: SourceLocation,
    },
    DeclList {
        decls: Vec<AstNode>,
        location: SourceLocation,
    },
    Block {
        statements: Vec<AstNode>,
        location: SourceLocation,
    },
    Return {
        expr: Option<Box<AstNode>>,
        location: SourceLocation,
    },
    If {
        condition: Box<AstNode>,
        then_branch: Vec<AstNode>,
        else_branch: Option<Vec<AstNode>>,
        location: SourceLocation,
    },
    While {
        condition: Box<AstNode>,
        body: Vec<AstNode>,
        location: SourceLocation,
    },
    DoWhile {
        body: Vec<AstNode>,
        condition: Box<AstNode>,
        location: SourceLocation,
    },
    For {
        init: Option<Box<AstNode>>,
        condition: Option<Box<AstNode>>,
        increment: Option<Box<AstNode>>,
        body: Vec<AstNode>,
        location: SourceLocation,
    },
    /// C++ range-for over a string or an array.
    ForEach {
        var_type: Type,
        name: String,
        by_ref: bool,
        iterable: Box<AstNode>,
        body: Vec<AstNode>,
        location: SourceLocation,
    },
    Switch {
        expr: Box<AstNode>,
        cases: Vec<CaseNode>,
        location: SourceLocation,
    },
    Break {
        location: SourceLocation,
    },
    Continue {
        location: SourceLocation,
    },
    ExpressionStatement {
        expr: Box<AstNode>,
        location: SourceLocation,
    },
    Empty {
        location: SourceLocation,
    },

    // Expressions
    IntLiteral(i64, SourceLocation),
    FloatLiteral(f64, SourceLocation),
    CharLiteral(i64, SourceLocation),
    StringLiteral(Vec<u8>, SourceLocation),
    Null {
        location: SourceLocation,
    },
    Variable(String, SourceLocation),
    BinaryOp {
        op: BinOp,
        left: Box<AstNode>,
        right: Box<AstNode>,
        location: SourceLocation,
    },
    UnaryOp {
        op: UnOp,
        operand: Box<AstNode>,
        location: SourceLocation,
    },
    TernaryOp {
        condition: Box<AstNode>,
        true_expr: Box<AstNode>,
        false_expr: Box<AstNode>,
        location: SourceLocation,
    },
    Assignment {
        lhs: Box<AstNode>,
        rhs: Box<AstNode>,
        location: SourceLocation,
    },
    CompoundAssignment {
        lhs: Box<AstNode>,
        op: BinOp,
        rhs: Box<AstNode>,
        location: SourceLocation,
    },
    Comma {
        left: Box<AstNode>,
        right: Box<AstNode>,
        location: SourceLocation,
    },
    FunctionCall {
        name: String,
        args: Vec<AstNode>,
        location: SourceLocation,
    },
    MethodCall {
        object: Box<AstNode>,
        method: String,
        args: Vec<AstNode>,
        location: SourceLocation,
    },
    ArrayAccess {
        array: Box<AstNode>,
        index: Box<AstNode>,
        location: SourceLocation,
    },
    Cast {
        target_type: Type,
        expr: Box<AstNode>,
        location: SourceLocation,
    },
    SizeofType {
        target_type: Type,
        location: SourceLocation,
    },
    SizeofExpr {
        expr: Box<AstNode>,
        location: SourceLocation,
    },
    InitList {
        items: Vec<AstNode>,
        location: SourceLocation,
    },

    // Produced by lowering
    /// Heap-array constructor for an array declaration.
    ArrayNew {
        elem_type: Type,
        dims: Vec<AstNode>,
        init: Option<Box<AstNode>>,
        location: SourceLocation,
    },
    /// `sizeof` that can only be answered at run time.
    SizeofValue {
        expr: Box<AstNode>,
        location: SourceLocation,
    },
    /// An assignable target passed where C passes `&x`.
    OutParam {
        target: Box<AstNode>,
        location: SourceLocation,
    },
    Scan {
        source: ScanSource,
        format: Box<AstNode>,
        targets: Vec<AstNode>,
        location: SourceLocation,
    },
    StreamWrite {
        stream: StdStream,
        items: Vec<StreamItem>,
        location: SourceLocation,
    },
    StreamRead {
        targets: Vec<(AstNode, TypeHint)>,
        location: SourceLocation,
    },
    ReadLine {
        target: Box<AstNode>,
        delimiter: Option<Box<AstNode>>,
        location: SourceLocation,
    },
}

impl AstNode {
    /// Get the source location of this node
    pub fn location(&self) -> &SourceLocation {
        match self {
            AstNode::FunctionDef { location, .. }
            | AstNode::FunctionDecl { location, .. }
            | AstNode::VarDecl { location, .. }
            | AstNode::DeclList { location, .. }
            | AstNode::Block { location, .. }
            | AstNode::Return { location, .. }
            | AstNode::If { location, .. }
            | AstNode::While { location, .. }
            | AstNode::DoWhile { location, .. }
            | AstNode::For { location, .. }
            | AstNode::ForEach { location, .. }
            | AstNode::Switch { location, .. }
            | AstNode::Break { location }
            | AstNode::Continue { location }
            | AstNode::ExpressionStatement { location, .. }
            | AstNode::Empty { location }
            | AstNode::Null { location }
            | AstNode::BinaryOp { location, .. }
            | AstNode::UnaryOp { location, .. }
            | AstNode::TernaryOp { location, .. }
            | AstNode::Assignment { location, .. }
            | AstNode::CompoundAssignment { location, .. }
            | AstNode::Comma { location, .. }
            | AstNode::FunctionCall { location, .. }
            | AstNode::MethodCall { location, .. }
            | AstNode::ArrayAccess { location, .. }
            | AstNode::Cast { location, .. }
            | AstNode::SizeofType { location, .. }
            | AstNode::SizeofExpr { location, .. }
            | AstNode::InitList { location, .. }
            | AstNode::ArrayNew { location, .. }
            | AstNode::SizeofValue { location, .. }
            | AstNode::OutParam { location, .. }
            | AstNode::Scan { location, .. }
            | AstNode::StreamWrite { location, .. }
            | AstNode::StreamRead { location, .. }
            | AstNode::ReadLine { location, .. } => location,
            AstNode::IntLiteral(_, loc)
            | AstNode::FloatLiteral(_, loc)
            | AstNode::CharLiteral(_, loc)
            | AstNode::StringLiteral(_, loc)
            | AstNode::Variable(_, loc) => loc,
        }
    }
}

/// Top-level program structure
#[derive(Debug, Clone, Default)]
pub struct Program {
    /// Function definitions, prototypes and global declarations in source order.
    pub nodes: Vec<AstNode>,
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }
}
