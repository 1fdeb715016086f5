//! Composition of tasks into sequences and parallel groups

use std::fmt;

/// A node of a task graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A registered task, by name
    Task(String),

    /// Children run one after another; the first failure stops the sequence
    Sequence(Vec<Node>),

    /// Children start together with no ordering between them
    Parallel(Vec<Node>),
}

impl Node {
    pub fn task(name: impl Into<String>) -> Self {
        Node::Task(name.into())
    }

    /// Task names referenced anywhere under this node, in order
    pub fn task_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Node::Task(name) => names.push(name),
            Node::Sequence(children) | Node::Parallel(children) => {
                for child in children {
                    child.collect_names(names);
                }
            }
        }
    }
}

/// Run the given nodes in order
pub fn series<I>(nodes: I) -> Node
where
    I: IntoIterator<Item = Node>,
{
    Node::Sequence(nodes.into_iter().collect())
}

/// Run the given nodes concurrently
pub fn parallel<I>(nodes: I) -> Node
where
    I: IntoIterator<Item = Node>,
{
    Node::Parallel(nodes.into_iter().collect())
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, children: &[Node], sep: &str| -> fmt::Result {
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    write!(f, "{}", sep)?;
                }
                write!(f, "{}", child)?;
            }
            Ok(())
        };

        match self {
            Node::Task(name) => write!(f, "{}", name),
            Node::Sequence(children) => {
                write!(f, "(")?;
                join(f, children, " → ")?;
                write!(f, ")")
            }
            Node::Parallel(children) => {
                write!(f, "{{")?;
                join(f, children, " | ")?;
                write!(f, "}}")
            }
        }
    }
}
