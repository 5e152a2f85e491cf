//! Interned names.
//!
//! Identifiers and property names go through a `StringDict` so that the
//! same name shares one `Rc<str>` across the lexer, the compiled constant
//! tables and the property trees. Array element names are requested often
//! enough that the first few are kept in a direct-indexed table.

use rustc_hash::FxHashSet;

use crate::value::{CheapClone, JsString};

/// Element names below this are served from `indices`.
const CACHED_INDICES: u32 = 64;

pub struct StringDict {
    /// Lookups borrow the set entries as `str`.
    strings: FxHashSet<JsString>,
    /// `"0"`, `"1"`, ... filled on first use
    indices: Vec<JsString>,
}

impl StringDict {
    pub fn new() -> Self {
        Self {
            strings: FxHashSet::default(),
            indices: Vec::new(),
        }
    }

    /// A dictionary that already holds the names the runtime itself uses.
    pub fn with_common_strings() -> Self {
        let mut dict = Self::new();
        for name in RUNTIME_NAMES {
            dict.get_or_insert(name);
        }
        dict
    }

    pub fn get_or_insert(&mut self, s: &str) -> JsString {
        if let Some(existing) = self.strings.get(s) {
            return existing.cheap_clone();
        }
        let name = JsString::from(s);
        self.strings.insert(name.cheap_clone());
        name
    }

    /// The canonical name of array element `index`.
    pub fn index(&mut self, index: u32) -> JsString {
        if index >= CACHED_INDICES {
            return self.get_or_insert(&index.to_string());
        }
        while self.indices.len() <= index as usize {
            let next = self.indices.len().to_string();
            let name = self.get_or_insert(&next);
            self.indices.push(name);
        }
        match self.indices.get(index as usize) {
            Some(name) => name.cheap_clone(),
            None => self.get_or_insert(&index.to_string()),
        }
    }

    pub fn get(&self, s: &str) -> Option<JsString> {
        self.strings.get(s).map(CheapClone::cheap_clone)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl Default for StringDict {
    fn default() -> Self {
        Self::new()
    }
}

/// Property, variable and `typeof` names the interpreter asks for itself.
const RUNTIME_NAMES: &[&str] = &[
    "length",
    "prototype",
    "constructor",
    "name",
    "message",
    "arguments",
    "callee",
    "toString",
    "valueOf",
    "hasOwnProperty",
    "call",
    "apply",
    "push",
    "join",
    "undefined",
    "object",
    "function",
    "boolean",
    "number",
    "string",
    "Object",
    "Function",
    "Array",
    "Boolean",
    "Number",
    "String",
    "Error",
    "EvalError",
    "RangeError",
    "ReferenceError",
    "SyntaxError",
    "TypeError",
    "URIError",
    "NaN",
    "Infinity",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_shares_allocation() {
        let mut dict = StringDict::new();
        let a = dict.get_or_insert("counter");
        let b = dict.get_or_insert("counter");
        assert!(JsString::ptr_eq(&a, &b));
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn runtime_names_preloaded() {
        let dict = StringDict::with_common_strings();
        assert!(dict.get("prototype").is_some());
        assert!(dict.get("valueOf").is_some());
        assert!(dict.get("frobnicate").is_none());
    }

    #[test]
    fn element_names_are_interned() {
        let mut dict = StringDict::new();
        let cached = dict.index(3);
        assert_eq!(cached.as_str(), "3");
        assert!(JsString::ptr_eq(&cached, &dict.get_or_insert("3")));

        let large = dict.index(1000);
        assert_eq!(large.as_str(), "1000");
        assert!(JsString::ptr_eq(&large, &dict.index(1000)));
    }
}
