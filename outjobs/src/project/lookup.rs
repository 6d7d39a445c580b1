use crate::attribute::AttributeLookup;

use super::{find_attribute, AssemblyVariant, Board, Project};

/// Attribute lookup chain: assembly variant, then board, then project.
#[derive(Debug, Clone, Copy)]
pub struct ProjectAttributeLookup<'a> {
    project: &'a Project,
    board: Option<&'a Board>,
    variant: Option<&'a AssemblyVariant>,
}

impl<'a> ProjectAttributeLookup<'a> {
    pub fn new(
        project: &'a Project,
        board: Option<&'a Board>,
        variant: Option<&'a AssemblyVariant>,
    ) -> Self {
        Self {
            project,
            board,
            variant,
        }
    }

    pub fn project(project: &'a Project) -> Self {
        Self::new(project, None, None)
    }

    fn variant_value(&self, key: &str) -> Option<String> {
        let variant = self.variant?;
        match key {
            "VARIANT" => Some(variant.name.clone()),
            "VARIANT_DESCRIPTION" => Some(variant.description.clone()),
            _ => None,
        }
    }

    fn board_value(&self, key: &str) -> Option<String> {
        let board = self.board?;
        match key {
            "BOARD" => Some(board.name.clone()),
            "BOARD_INDEX" => self
                .project
                .board_index(&board.uuid)
                .map(|index| index.to_string()),
            _ => find_attribute(&board.attributes, key).map(str::to_string),
        }
    }

    fn project_value(&self, key: &str) -> Option<String> {
        match key {
            "PROJECT" => Some(self.project.name.clone()),
            "VERSION" => Some(self.project.version.clone()),
            "AUTHOR" => Some(self.project.author.clone()),
            _ => self.project.attribute(key).map(str::to_string),
        }
    }
}

impl AttributeLookup for ProjectAttributeLookup<'_> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.variant_value(key)
            .or_else(|| self.board_value(key))
            .or_else(|| self.project_value(key))
    }
}
