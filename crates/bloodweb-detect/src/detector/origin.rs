use bloodweb_core::{BoardError, BoardImage, DetectionStage, Node, NodeBuilder};
use nalgebra::Point2;

use super::{check_views, icon_patch, Detector};
use crate::atlas::TemplateAtlas;
use crate::circles::{detect_circles_in, CircleCandidate, Roi};
use crate::consensus::{apply_quorum, cluster_views};

#[cfg(feature = "tracing")]
use tracing::instrument;

impl Detector {
    /// Locate the board origin. Exactly one origin circle must reach quorum.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, views), fields(views = views.len()))
    )]
    pub fn locate_origin(&self, views: &[BoardImage]) -> Result<Node, BoardError> {
        check_views(views)?;
        let p = &self.params.origin;
        let (w, h) = (views[0].width(), views[0].height());
        let expected = p
            .expected_center
            .map(|[x, y]| Point2::new(x, y))
            .unwrap_or_else(|| Point2::new(w as f32 * 0.5, h as f32 * 0.5));

        let window = p.search_radius + p.circles.max_radius + 2.0;
        let roi = Roi::around(expected, window, w, h).ok_or_else(|| {
            BoardError::inconclusive(
                DetectionStage::Origin,
                format!(
                    "search window around ({:.0}, {:.0}) is outside the capture",
                    expected.x, expected.y
                ),
            )
        })?;

        let per_view: Vec<Vec<CircleCandidate>> = views
            .iter()
            .map(|view| {
                detect_circles_in(view.gray_ref(), &p.circles, Some(roi))
                    .into_iter()
                    .filter(|c| (c.center - expected).norm() <= p.search_radius)
                    .collect()
            })
            .collect();

        let quorum = self.quorum(views.len());
        let clusters = cluster_views(&per_view, &self.params.consensus);
        let (accepted, rejected) = apply_quorum(clusters, quorum);
        log::debug!(
            "origin: {} candidate(s) at quorum {}/{}, {} below",
            accepted.len(),
            quorum,
            views.len(),
            rejected.len()
        );

        match accepted.as_slice() {
            [one] => NodeBuilder::origin(one.center)
                .radius(one.radius)
                .build()
                .map_err(|e| BoardError::inconclusive(DetectionStage::Origin, e.to_string())),
            [] => Err(BoardError::inconclusive(
                DetectionStage::Origin,
                format!(
                    "no origin candidate seen in {quorum} of {} captures",
                    views.len()
                ),
            )),
            many => Err(BoardError::inconclusive(
                DetectionStage::Origin,
                format!("{} origin candidates", many.len()),
            )),
        }
    }

    /// Reject boards whose origin matches a prestige template.
    ///
    /// Without origin templates in the atlas every origin passes.
    pub fn check_origin(
        &self,
        views: &[BoardImage],
        origin: &Node,
        atlas: &TemplateAtlas,
    ) -> Result<(), BoardError> {
        if atlas.origins().is_empty() {
            return Ok(());
        }
        let half = origin.radius() * self.params.icons.crop_fraction;
        let Some(patch) = icon_patch(views.iter(), atlas, origin.position(), half) else {
            return Ok(());
        };
        let Some(m) = atlas.best_origin_match(&patch) else {
            return Ok(());
        };
        log::debug!("origin looks like `{}` ({:.2})", m.template.name, m.score);
        if m.template.prestige && m.score >= self.params.origin.min_confidence {
            return Err(BoardError::UnexpectedBoardState(format!(
                "prestige origin `{}` (score {:.2})",
                m.template.name, m.score
            )));
        }
        Ok(())
    }
}
