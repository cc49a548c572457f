//! The checking session
//!
//! A [`Program`] owns every source file, the default-import tree and the
//! type cache. Per-file derived data (bindings, resolved modules, import
//! tables) is computed on first use and dropped whenever the file set
//! changes.

use crate::binder::{bind, BindResult};
use crate::core;
use crate::expression::ModuleDeclaration;
use crate::imports::{build_imports, Imports, ModuleExports};
use crate::syntax::{parse, FileId, NodeKind, NodeRef, SyntaxNode, SyntaxTree};
use crate::typeck::{TypeCache, TypeChecker};
use indexmap::IndexMap;
use once_cell::unsync::OnceCell;
use std::cell::RefCell;
use std::collections::HashMap;

/// How a file takes part in the program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOptions {
    /// Whether the user may edit the file
    pub writeable: bool,
    pub is_test_file: bool,
    /// Owning package; `None` for project files
    pub package: Option<String>,
    /// Package only visible to test files
    pub test_dependency: bool,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self::project()
    }
}

impl FileOptions {
    pub fn project() -> Self {
        Self {
            writeable: true,
            is_test_file: false,
            package: None,
            test_dependency: false,
        }
    }

    pub fn test() -> Self {
        Self {
            is_test_file: true,
            ..Self::project()
        }
    }

    pub fn package(name: impl Into<String>) -> Self {
        Self {
            writeable: false,
            is_test_file: false,
            package: Some(name.into()),
            test_dependency: false,
        }
    }

    pub fn test_dependency(name: impl Into<String>) -> Self {
        Self {
            test_dependency: true,
            ..Self::package(name)
        }
    }
}

/// One parsed file and the data derived from it
#[derive(Debug)]
pub struct SourceFile {
    tree: SyntaxTree,
    options: FileOptions,
    module_name: String,
    bound: OnceCell<BindResult>,
    resolved_modules: OnceCell<IndexMap<String, FileId>>,
    imports: OnceCell<Imports>,
}

impl SourceFile {
    fn new(tree: SyntaxTree, options: FileOptions) -> Self {
        let module_name = tree
            .root()
            .children()
            .find_map(ModuleDeclaration::cast)
            .and_then(|m| m.name())
            .map(|n| n.text().to_string())
            .unwrap_or_else(|| "Main".to_string());
        Self {
            tree,
            options,
            module_name,
            bound: OnceCell::new(),
            resolved_modules: OnceCell::new(),
            imports: OnceCell::new(),
        }
    }

    pub fn id(&self) -> FileId {
        self.tree.file()
    }

    pub fn uri(&self) -> &str {
        self.tree.uri()
    }

    pub fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    pub fn root(&self) -> SyntaxNode<'_> {
        self.tree.root()
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn options(&self) -> &FileOptions {
        &self.options
    }

    pub fn is_writeable(&self) -> bool {
        self.options.writeable
    }

    pub fn is_test_file(&self) -> bool {
        self.options.is_test_file
    }

    pub fn package(&self) -> Option<&str> {
        self.options.package.as_deref()
    }

    /// Project files are the user's own; their cached types can go stale
    pub fn is_project_file(&self) -> bool {
        self.options.package.is_none()
    }

    fn reset_derived(&mut self) {
        self.resolved_modules.take();
        self.imports.take();
    }
}

/// A checking session over a set of files
pub struct Program {
    files: Vec<Option<SourceFile>>,
    by_uri: HashMap<String, FileId>,
    virtual_imports: SyntaxTree,
    cache: RefCell<TypeCache>,
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

impl Program {
    /// An empty program with the default imports but no modules behind them
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            by_uri: HashMap::new(),
            virtual_imports: parse(FileId::VIRTUAL_IMPORTS, "virtual:imports", core::DEFAULT_IMPORTS),
            cache: RefCell::new(TypeCache::new()),
        }
    }

    /// A program with the bundled core package loaded
    pub fn with_core() -> Self {
        let mut program = Self::new();
        for (uri, source) in core::MODULES {
            program.add_file(*uri, *source, FileOptions::package(core::PACKAGE));
        }
        program
    }

    /// Parse `text` as `uri`. A file already registered under `uri` is
    /// replaced and keeps its id.
    pub fn add_file(&mut self, uri: impl Into<String>, text: impl Into<String>, options: FileOptions) -> FileId {
        let uri = uri.into();
        let id = match self.by_uri.get(&uri) {
            Some(id) => *id,
            None => {
                let id = FileId(self.files.len() as u32);
                self.files.push(None);
                self.by_uri.insert(uri.clone(), id);
                id
            }
        };
        let replaced = self.files[id.0 as usize].is_some();
        let tree = parse(id, uri.as_str(), text);
        tracing::debug!(uri = %uri, replaced, "adding file");
        let is_package = options.package.is_some();
        self.files[id.0 as usize] = Some(SourceFile::new(tree, options));
        self.files_changed(replaced && is_package);
        id
    }

    /// Drop the file registered under `uri`
    pub fn remove_file(&mut self, uri: &str) -> bool {
        let Some(id) = self.by_uri.remove(uri) else {
            return false;
        };
        let was_package = self.files[id.0 as usize]
            .take()
            .map(|f| !f.is_project_file())
            .unwrap_or(false);
        tracing::debug!(uri, "removing file");
        self.files_changed(was_package);
        true
    }

    fn files_changed(&mut self, package_changed: bool) {
        for file in self.files.iter_mut().flatten() {
            file.reset_derived();
        }
        let mut cache = self.cache.borrow_mut();
        if package_changed {
            cache.clear();
        } else {
            cache.clear_project();
        }
    }

    pub fn file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn file_by_uri(&self, uri: &str) -> Option<&SourceFile> {
        self.by_uri.get(uri).and_then(|id| self.file(*id))
    }

    /// First file declaring module `name`, project files before packages
    pub fn file_by_module(&self, name: &str) -> Option<&SourceFile> {
        let mut candidates = self.files().filter(|f| f.module_name() == name);
        let first = candidates.next()?;
        if first.is_project_file() {
            return Some(first);
        }
        candidates.find(|f| f.is_project_file()).or(Some(first))
    }

    pub fn files(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.iter().flatten()
    }

    pub fn project_files(&self) -> impl Iterator<Item = &SourceFile> {
        self.files().filter(|f| f.is_project_file())
    }

    pub fn virtual_imports(&self) -> &SyntaxTree {
        &self.virtual_imports
    }

    /// Tree of `file`, including the default-import tree
    pub fn tree(&self, file: FileId) -> Option<&SyntaxTree> {
        if file == FileId::VIRTUAL_IMPORTS {
            return Some(&self.virtual_imports);
        }
        self.file(file).map(SourceFile::tree)
    }

    pub fn node(&self, node: NodeRef) -> Option<SyntaxNode<'_>> {
        self.tree(node.file)?.get(node.id)
    }

    /// Bindings of `file`, computed on first use
    pub fn bind<'a>(&self, file: &'a SourceFile) -> &'a BindResult {
        file.bound
            .get_or_init(|| bind(&file.tree, Some(&self.virtual_imports)))
    }

    /// Module name to the file providing it, for every module `file` imports
    pub fn resolved_modules<'a>(&self, file: &'a SourceFile) -> &'a IndexMap<String, FileId> {
        file.resolved_modules.get_or_init(|| {
            let mut resolved = IndexMap::new();
            for clause in self.import_clauses(file) {
                let Some(name) = clause
                    .child_by_field("moduleName")
                    .map(|n| n.text().to_string())
                else {
                    continue;
                };
                if resolved.contains_key(&name) {
                    continue;
                }
                if let Some(target) = self.visible_module(file, &name) {
                    resolved.insert(name, target);
                }
            }
            resolved
        })
    }

    fn visible_module(&self, from: &SourceFile, name: &str) -> Option<FileId> {
        let visible = |f: &&SourceFile| f.module_name() == name && (!f.options.test_dependency || from.is_test_file());
        let mut candidates = self.files().filter(visible);
        let first = candidates.next()?;
        if first.is_project_file() {
            return Some(first.id());
        }
        Some(candidates.find(|f| f.is_project_file()).unwrap_or(first).id())
    }

    /// Default import clauses (minus the file's own module) then the file's
    pub fn import_clauses<'a>(&'a self, file: &'a SourceFile) -> impl Iterator<Item = SyntaxNode<'a>> + 'a {
        let own = file.module_name();
        self.virtual_imports
            .root()
            .children_of_kind(NodeKind::ImportClause)
            .filter(move |c| {
                c.child_by_field("moduleName").map(|n| n.text()) != Some(own)
            })
            .chain(file.tree.root().children_of_kind(NodeKind::ImportClause))
    }

    /// Import tables of `file`, computed on first use
    pub fn imports<'a>(&self, file: &'a SourceFile) -> &'a Imports {
        file.imports.get_or_init(|| {
            tracing::debug!(uri = file.uri(), "building import tables");
            let resolved = self.resolved_modules(file);
            build_imports(self.import_clauses(file), |name| {
                let target = self.file(*resolved.get(name)?)?;
                Some(ModuleExports {
                    name: target.module_name(),
                    uri: target.uri(),
                    package: target.package(),
                    tree: target.tree(),
                    exposing: self.bind(target).exposing(),
                })
            })
        })
    }

    /// The project changed: forget every cached project type
    pub fn mark_dirty(&self) {
        tracing::debug!("project marked dirty");
        self.cache.borrow_mut().clear_project();
    }

    /// Forget the cached type of one value declaration and of the
    /// annotations inferred on its behalf
    pub fn invalidate_value_declaration(&self, declaration: NodeRef) {
        self.cache.borrow_mut().invalidate_value_declaration(declaration);
    }

    pub fn invalidate_type_declaration(&self, declaration: NodeRef) {
        self.cache.borrow_mut().invalidate_type_declaration(declaration);
    }

    pub fn type_checker(&self) -> TypeChecker<'_> {
        TypeChecker::new(self)
    }

    pub(crate) fn cache(&self) -> &RefCell<TypeCache> {
        &self.cache
    }

    /// Whether `node` sits in a project file, which decides its cache
    /// partition
    pub(crate) fn is_project_node(&self, node: NodeRef) -> bool {
        self.file(node.file)
            .map(SourceFile::is_project_file)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_replacing_a_file_keeps_its_id() {
        let mut program = Program::new();
        let first = program.add_file("a.elm", "module A exposing (..)\n\nx = 1\n", FileOptions::project());
        let second = program.add_file("a.elm", "module A exposing (..)\n\ny = 2\n", FileOptions::project());
        assert_eq!(first, second);
        assert_eq!(program.files().count(), 1);
        let file = program.file(first).unwrap();
        assert!(program.bind(file).root_table().contains("y"));
    }

    #[test]
    fn test_module_lookup_and_removal() {
        let mut program = Program::with_core();
        program.add_file("src/Main.elm", "module Main exposing (..)\n", FileOptions::project());
        assert_eq!(program.file_by_module("Main").unwrap().uri(), "src/Main.elm");
        assert!(program.file_by_module("List").is_some());
        assert!(program.remove_file("src/Main.elm"));
        assert!(program.file_by_module("Main").is_none());
        assert!(!program.remove_file("src/Main.elm"));
    }

    #[test]
    fn test_resolved_modules_include_defaults() {
        let mut program = Program::with_core();
        let id = program.add_file(
            "src/Main.elm",
            "module Main exposing (..)\n\nimport Missing\n\nx = 1\n",
            FileOptions::project(),
        );
        let file = program.file(id).unwrap();
        let resolved = program.resolved_modules(file);
        assert!(resolved.contains_key("Basics"));
        assert!(resolved.contains_key("Platform.Cmd"));
        assert!(!resolved.contains_key("Missing"));
    }

    /// Derived tables live in the file, so they may outlive the
    /// `&Program` they were requested through
    fn derived<'a>(program: &Program, file: &'a SourceFile) -> (&'a BindResult, &'a Imports) {
        (program.bind(file), program.imports(file))
    }

    #[test]
    fn test_derived_tables_borrow_from_the_file() {
        let mut program = Program::with_core();
        let id = program.add_file("src/Main.elm", "module Main exposing (..)\n\nx = 1\n", FileOptions::project());
        let file = program.file(id).unwrap();
        let (bound, imports) = derived(&program, file);
        assert!(bound.root_table().contains("x"));
        assert!(matches!(imports.var("identity"), crate::imports::Resolution::Found(_)));
    }

    #[test]
    fn test_test_dependencies_only_visible_to_tests() {
        let mut program = Program::with_core();
        program.add_file(
            "deps/Expect.elm",
            "module Expect exposing (..)\n\npass = 1\n",
            FileOptions::test_dependency("elm-explorations/test"),
        );
        let source = "module M exposing (..)\n\nimport Expect\n";
        let app = program.add_file("src/M.elm", source, FileOptions::project());
        let test = program.add_file("tests/M.elm", source.replace("module M", "module MTest"), FileOptions::test());

        let app = program.file(app).unwrap();
        assert!(!program.resolved_modules(app).contains_key("Expect"));
        let test = program.file(test).unwrap();
        assert!(program.resolved_modules(test).contains_key("Expect"));
    }

    #[test]
    fn test_own_module_is_not_imported_by_default() {
        let program = Program::with_core();
        let basics = program.file_by_module("Basics").unwrap();
        let names: Vec<_> = program
            .import_clauses(basics)
            .filter_map(|c| c.child_by_field("moduleName"))
            .map(|n| n.text())
            .collect();
        assert!(!names.contains(&"Basics"));
        assert!(names.contains(&"List"));
    }
}
