//! Symbol kinds as enumerated by the protocol

use serde::Serialize;

/// LSP SymbolKind (1..=26)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SymbolKind {
    File,
    Module,
    Namespace,
    Package,
    Class,
    Method,
    Property,
    Field,
    Constructor,
    Enum,
    Interface,
    Function,
    Variable,
    Constant,
    String,
    Number,
    Boolean,
    Array,
    Object,
    Key,
    Null,
    EnumMember,
    Struct,
    Event,
    Operator,
    TypeParameter,
}

const KINDS: [SymbolKind; 26] = [
    SymbolKind::File,
    SymbolKind::Module,
    SymbolKind::Namespace,
    SymbolKind::Package,
    SymbolKind::Class,
    SymbolKind::Method,
    SymbolKind::Property,
    SymbolKind::Field,
    SymbolKind::Constructor,
    SymbolKind::Enum,
    SymbolKind::Interface,
    SymbolKind::Function,
    SymbolKind::Variable,
    SymbolKind::Constant,
    SymbolKind::String,
    SymbolKind::Number,
    SymbolKind::Boolean,
    SymbolKind::Array,
    SymbolKind::Object,
    SymbolKind::Key,
    SymbolKind::Null,
    SymbolKind::EnumMember,
    SymbolKind::Struct,
    SymbolKind::Event,
    SymbolKind::Operator,
    SymbolKind::TypeParameter,
];

impl SymbolKind {
    /// Map a protocol kind code; codes outside 1..=26 have no kind
    pub fn from_code(code: u64) -> Option<Self> {
        let index = usize::try_from(code).ok()?.checked_sub(1)?;
        KINDS.get(index).copied()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::File => "File",
            Self::Module => "Module",
            Self::Namespace => "Namespace",
            Self::Package => "Package",
            Self::Class => "Class",
            Self::Method => "Method",
            Self::Property => "Property",
            Self::Field => "Field",
            Self::Constructor => "Constructor",
            Self::Enum => "Enum",
            Self::Interface => "Interface",
            Self::Function => "Function",
            Self::Variable => "Variable",
            Self::Constant => "Constant",
            Self::String => "String",
            Self::Number => "Number",
            Self::Boolean => "Boolean",
            Self::Array => "Array",
            Self::Object => "Object",
            Self::Key => "Key",
            Self::Null => "Null",
            Self::EnumMember => "EnumMember",
            Self::Struct => "Struct",
            Self::Event => "Event",
            Self::Operator => "Operator",
            Self::TypeParameter => "TypeParameter",
        }
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Symbol list label: `[<kind>]<tab><name>`
pub fn symbol_label(kind_code: u64, name: &str) -> String {
    let kind = SymbolKind::from_code(kind_code)
        .map(|k| k.name())
        .unwrap_or("Unknown");
    format!("[{kind}]\t{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_table_bounds() {
        assert_eq!(SymbolKind::from_code(1), Some(SymbolKind::File));
        assert_eq!(SymbolKind::from_code(12), Some(SymbolKind::Function));
        assert_eq!(SymbolKind::from_code(23), Some(SymbolKind::Struct));
        assert_eq!(SymbolKind::from_code(26), Some(SymbolKind::TypeParameter));
        assert_eq!(SymbolKind::from_code(0), None);
        assert_eq!(SymbolKind::from_code(27), None);
    }

    #[test]
    fn test_every_code_round_trips_to_its_name() {
        for code in 1..=26u64 {
            let kind = SymbolKind::from_code(code).expect("kind in range");
            assert_eq!(KINDS[code as usize - 1], kind);
            assert!(!kind.name().is_empty());
        }
    }

    #[test]
    fn test_symbol_label() {
        assert_eq!(symbol_label(12, "main"), "[Function]\tmain");
        assert_eq!(symbol_label(99, "odd"), "[Unknown]\todd");
    }
}
