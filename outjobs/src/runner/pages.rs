use uuid::Uuid;

use crate::core::JobError;
use crate::export::{GraphicsPage, PageSource};
use crate::job::graphics::is_valid_page_size;
use crate::job::{ContentType, GraphicsJob};

use super::OutputJobRunner;

impl OutputJobRunner<'_> {
    /// Expands the contents of a graphics job into pages: schematic pages
    /// per board and variant, board pages per board and variant. With
    /// `rebuild_planes`, outdated planes of the boards are refilled first.
    pub fn build_pages(
        &mut self,
        job: &GraphicsJob,
        rebuild_planes: bool,
    ) -> crate::Result<Vec<GraphicsPage>> {
        let mut pages = Vec::new();
        for content in &job.content {
            if let Some(key) = &content.page_size {
                if !is_valid_page_size(key) {
                    return Err(JobError::UnsupportedPageSize(key.clone()));
                }
            }
            let boards: Vec<Option<Uuid>> = content
                .boards
                .resolve_optional(&self.project.boards, false, JobError::BoardNotFound)?
                .into_iter()
                .map(|board| board.map(|b| b.uuid))
                .collect();
            let variants: Vec<Option<Uuid>> = content
                .variants
                .resolve_optional(
                    &self.project.assembly_variants,
                    false,
                    JobError::AssemblyVariantNotFound,
                )?
                .into_iter()
                .map(|variant| variant.map(|v| v.uuid))
                .collect();

            match content.content_type {
                ContentType::Schematic => {
                    for variant in &variants {
                        for _board in &boards {
                            for index in 0..self.project.schematics.len() {
                                pages.push(GraphicsPage {
                                    source: PageSource::Schematic(index),
                                    assembly_variant: *variant,
                                    settings: content.clone(),
                                });
                            }
                        }
                    }
                }
                ContentType::Board | ContentType::BoardRendering => {
                    let boards: Vec<Uuid> = boards.into_iter().flatten().collect();
                    if rebuild_planes {
                        self.rebuild_planes(&boards)?;
                    }
                    for board in boards {
                        for variant in &variants {
                            let source = match content.content_type {
                                ContentType::BoardRendering => PageSource::BoardRendering(board),
                                _ => PageSource::Board(board),
                            };
                            pages.push(GraphicsPage {
                                source,
                                assembly_variant: *variant,
                                settings: content.clone(),
                            });
                        }
                    }
                }
                ContentType::AssemblyGuide => {
                    return Err(JobError::NotSupported(
                        "Assembly guide output jobs are not supported yet, you need to use a \
                         more recent release."
                            .to_string(),
                    ));
                }
            }
        }
        Ok(pages)
    }
}
