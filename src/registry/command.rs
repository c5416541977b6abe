use crate::capability::Capabilities;
use crate::config::CommandDecl;
use crate::error::Result;
use crate::grammar::Parameter;
use crate::tree::{CommandTree, TreeBuilder, TreeSettings};

/// A registered command: its names and its sealed grammar tree.
pub struct Command<S> {
    aliases: Vec<String>,
    description: Option<String>,
    tree: CommandTree<S>,
}

impl<S> Command<S> {
    /// Wrap an already validated tree. Aliases are taken from the root literal.
    pub fn new(tree: CommandTree<S>) -> Self {
        let aliases = tree.root().param().names().skip(1).map(String::from).collect();
        let description = tree.root().param().description().map(String::from);
        Self {
            aliases,
            description,
            tree,
        }
    }

    /// Build, validate and wrap the tree for a declared command.
    pub fn from_decl(decl: &CommandDecl, caps: Capabilities<S>, settings: TreeSettings) -> Result<Self> {
        let mut root = Parameter::literal(&decl.name).with_aliases(decl.aliases.iter().cloned());
        if let Some(p) = &decl.permission {
            root = root.with_permission(p);
        }
        if let Some(d) = &decl.description {
            root = root.with_description(d);
        }
        let mut builder = TreeBuilder::new(root);
        for usage in &decl.usages {
            builder.insert_usage(usage.to_usage(&decl.name)?)?;
        }
        Ok(Self::new(builder.validate(caps, settings)?))
    }

    pub fn name(&self) -> &str {
        self.tree.name()
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Name and aliases, primary name first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name()).chain(self.aliases.iter().map(String::as_str))
    }

    pub fn tree(&self) -> &CommandTree<S> {
        &self.tree
    }

    /// Whether the source may use this command at all.
    pub fn permits(&self, source: &S) -> bool {
        self.tree
            .capabilities()
            .permits(source, self.tree.root().permission())
    }

}

impl<S> std::fmt::Debug for Command<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name())
            .field("aliases", &self.aliases)
            .field("tree", &self.tree)
            .finish()
    }
}
