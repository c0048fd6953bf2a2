use anyhow::{anyhow, bail, Result};
use chrono::Utc;

use crate::config::WidgetConfig;
use crate::dom::{Document, DomEvent, EventResponse, NodeId};
use crate::layout::{self, Scroll};
use crate::locator;
use crate::models::{ElementLocator, Rating, ReviewerIdentity, Spike, SpikeKind, Viewport};
use crate::utils::new_id;
use crate::{log_debug, log_info};

use super::state::{
    CaptureMode, CapturePopover, CaptureSession, CapturedTarget, FeedbackForm, FormSurface,
    HighlightGuard, Listener,
};
use super::ui::{is_excluded_element, is_widget_element, WidgetUi};

const ENABLE_LOGS: bool = true;

const POPOVER_SELECTOR_LABEL_MAX: usize = 40;
const POPOVER_TEXT_LABEL_MAX: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved(Spike),
    /// No reviewer identity yet; the name prompt is showing and the form
    /// is kept until [`CaptureMachine::identity_created`] completes it.
    AwaitingIdentity,
}

/// Drives idle → armed → capturing for one mounted widget.
pub struct CaptureMachine {
    config: WidgetConfig,
    ui: WidgetUi,
    session: CaptureSession,
    reviewer: Option<ReviewerIdentity>,
}

impl CaptureMachine {
    pub fn mount(doc: &mut Document, config: WidgetConfig) -> Result<Self> {
        let ui = WidgetUi::mount(doc, &config)?;
        Ok(Self {
            config,
            ui,
            session: CaptureSession::default(),
            reviewer: None,
        })
    }

    pub fn mode(&self) -> CaptureMode {
        self.session.mode
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn ui(&self) -> &WidgetUi {
        &self.ui
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn reviewer(&self) -> Option<&ReviewerIdentity> {
        self.reviewer.as_ref()
    }

    pub fn highlighted(&self) -> Option<NodeId> {
        self.session.highlighted()
    }

    pub fn captured(&self) -> Option<&CapturedTarget> {
        self.session.target.as_ref()
    }

    pub fn form(&self) -> Option<&FeedbackForm> {
        self.session.form.as_ref()
    }

    pub fn set_reviewer(&mut self, doc: &mut Document, reviewer: Option<ReviewerIdentity>) {
        self.ui
            .set_reviewer_label(doc, reviewer.as_ref().map(|identity| identity.name.as_str()));
        self.reviewer = reviewer;
    }

    /// The trigger button: arms from idle, falls back to page feedback from
    /// armed, and is ignored while capturing.
    pub fn trigger(&mut self, doc: &mut Document) -> Result<()> {
        match self.session.mode {
            CaptureMode::Idle => {
                self.close_modal(doc);
                self.arm(doc);
                Ok(())
            }
            CaptureMode::Armed => {
                self.disarm(doc);
                self.open_page_modal(doc)
            }
            CaptureMode::Capturing => Ok(()),
        }
    }

    pub fn handle_event(&mut self, doc: &mut Document, event: &DomEvent) -> Result<EventResponse> {
        if let DomEvent::Click { target } = event {
            if doc.contains(self.ui.button, *target) {
                self.trigger(doc)?;
                return Ok(EventResponse::stop());
            }
            if doc.contains(self.ui.reviewer, *target) {
                if let Some(reviewer) = &self.reviewer {
                    self.ui.show_rename_dialog(doc, &reviewer.name);
                    return Ok(EventResponse::stop());
                }
            }
        }
        if self.ui.is_rename_open(doc) {
            let dismiss = match event {
                DomEvent::Click { target } => *target == self.ui.name_overlay,
                event => event.is_cancel_key(),
            };
            if dismiss {
                self.ui.hide_rename_dialog(doc);
                return Ok(EventResponse::pass());
            }
        }

        let attached = |listener| self.session.listeners.is_attached(listener);
        let hovering = attached(Listener::Hover);
        let unhovering = attached(Listener::Unhover);
        let targeting = attached(Listener::TargetClick);
        let outside = attached(Listener::ClickOutside);
        let cancelling = attached(Listener::CancelKey);

        match event {
            DomEvent::MouseOver { target } if hovering => {
                on_hover(&mut self.session, doc, *target);
                Ok(EventResponse::pass())
            }
            DomEvent::MouseOut { .. } if unhovering => {
                self.session.clear_highlight(doc);
                Ok(EventResponse::pass())
            }
            DomEvent::Click { target } if targeting => self.capture_target(doc, *target),
            DomEvent::Click { target } if outside => {
                if !doc.contains(self.ui.popover, *target) && !is_widget_element(doc, *target) {
                    self.close_popover(doc);
                }
                Ok(EventResponse::pass())
            }
            DomEvent::Click { target }
                if *target == self.ui.modal && self.ui.is_modal_open(doc) =>
            {
                self.close_modal(doc);
                Ok(EventResponse::pass())
            }
            event if event.is_cancel_key() && cancelling => {
                self.on_cancel_key(doc)?;
                Ok(EventResponse::pass())
            }
            event if event.is_cancel_key() && self.ui.is_modal_open(doc) => {
                self.close_modal(doc);
                Ok(EventResponse::pass())
            }
            _ => Ok(EventResponse::pass()),
        }
    }

    pub fn is_rename_open(&self, doc: &Document) -> bool {
        self.ui.is_rename_open(doc)
    }

    pub fn close_rename(&mut self, doc: &mut Document) {
        self.ui.hide_rename_dialog(doc);
    }

    /// The cancel button of whichever surface is open; also abandons arming.
    pub fn cancel(&mut self, doc: &mut Document) {
        match self.session.mode {
            CaptureMode::Capturing => self.close_popover(doc),
            CaptureMode::Armed => self.disarm(doc),
            CaptureMode::Idle => self.close_modal(doc),
        }
    }

    pub fn select_rating(&mut self, rating: Option<Rating>) -> Result<()> {
        let form = self.open_form_mut()?;
        form.rating = rating;
        Ok(())
    }

    pub fn set_comment(&mut self, comment: &str) -> Result<()> {
        let form = self.open_form_mut()?;
        form.comment = comment.to_string();
        Ok(())
    }

    pub fn save(&mut self, doc: &mut Document) -> Result<SaveOutcome> {
        let surface = self.open_form_mut()?.surface;

        let Some(reviewer) = self.reviewer.clone() else {
            if let Some(form) = self.session.form.as_mut() {
                form.awaiting_identity = true;
            }
            let area = self.prompt_area(surface);
            self.ui.show_name_prompt(doc, area)?;
            self.ui.flag_name_prompt(doc, area);
            log_debug!("Save held until a reviewer identity exists");
            return Ok(SaveOutcome::AwaitingIdentity);
        };

        self.commit(doc, &reviewer).map(SaveOutcome::Saved)
    }

    /// Record a freshly created identity. A save that was waiting on it is
    /// completed here, once, with the rating and comment it had.
    pub fn identity_created(
        &mut self,
        doc: &mut Document,
        identity: ReviewerIdentity,
    ) -> Result<Option<Spike>> {
        self.set_reviewer(doc, Some(identity.clone()));

        let Some(form) = self.session.form.as_ref() else {
            return Ok(None);
        };
        let surface = form.surface;
        let awaiting = form.awaiting_identity;

        let area = self.prompt_area(surface);
        self.ui.clear_prompt(doc, area);

        if !awaiting {
            return Ok(None);
        }
        self.commit(doc, &identity).map(Some)
    }

    fn open_form_mut(&mut self) -> Result<&mut FeedbackForm> {
        self.session
            .form
            .as_mut()
            .ok_or_else(|| anyhow!("no feedback form is open"))
    }

    fn prompt_area(&self, surface: FormSurface) -> NodeId {
        match surface {
            FormSurface::PageModal => self.ui.modal_prompt_area,
            FormSurface::ElementPopover => self.ui.popover_prompt_area,
        }
    }

    fn arm(&mut self, doc: &mut Document) {
        self.session.clear_highlight(doc);
        let body = doc.body();
        self.session.prior_body_cursor = Some(doc.style(body, "cursor").to_string());
        doc.set_style(body, "cursor", "crosshair");
        self.ui.set_armed_affordance(doc, true);
        self.session.set_mode(CaptureMode::Armed);
        log_debug!("Capture armed");
    }

    /// Undo everything arming changed on the page.
    fn restore_page_affordances(&mut self, doc: &mut Document) {
        self.session.clear_highlight(doc);
        if let Some(prior) = self.session.prior_body_cursor.take() {
            let body = doc.body();
            doc.set_style(body, "cursor", &prior);
        }
        self.ui.set_armed_affordance(doc, false);
    }

    fn disarm(&mut self, doc: &mut Document) {
        self.restore_page_affordances(doc);
        self.session.target = None;
        self.session.set_mode(CaptureMode::Idle);
    }

    fn on_cancel_key(&mut self, doc: &mut Document) -> Result<()> {
        match self.session.mode {
            CaptureMode::Armed => {
                self.disarm(doc);
                self.open_page_modal(doc)
            }
            CaptureMode::Capturing => {
                self.close_popover(doc);
                Ok(())
            }
            CaptureMode::Idle => Ok(()),
        }
    }

    fn capture_target(&mut self, doc: &mut Document, target: NodeId) -> Result<EventResponse> {
        // The widget's own controls keep working while armed.
        if is_widget_element(doc, target) || is_excluded_element(doc, target) {
            return Ok(EventResponse::pass());
        }

        let locator = locator::locate(doc, target)?;
        let popover = self.popover_for(doc, target, &locator);

        self.restore_page_affordances(doc);
        self.session.set_mode(CaptureMode::Capturing);
        self.ui.show_popover(doc, popover.placement);
        self.session.target = Some(CapturedTarget {
            node: target,
            locator,
            popover,
        });
        self.session.form = Some(FeedbackForm::new(FormSurface::ElementPopover));

        if self.reviewer.is_none() {
            self.ui.show_name_prompt(doc, self.ui.popover_prompt_area)?;
        }

        log_debug!("Captured element target");
        Ok(EventResponse::consume())
    }

    fn popover_for(&self, doc: &Document, target: NodeId, locator: &ElementLocator) -> CapturePopover {
        let text = locator
            .element_text
            .as_deref()
            .filter(|text| !text.is_empty())
            .unwrap_or("<no text>");

        CapturePopover {
            selector_label: layout::truncate_label(&locator.selector, POPOVER_SELECTOR_LABEL_MAX),
            text_label: layout::truncate_label(text, POPOVER_TEXT_LABEL_MAX),
            placement: layout::capture_popover(
                doc.bounding_client_rect(target),
                Scroll {
                    x: doc.scroll_x(),
                    y: doc.scroll_y(),
                },
                doc.viewport(),
            ),
        }
    }

    fn open_page_modal(&mut self, doc: &mut Document) -> Result<()> {
        self.close_popover(doc);
        self.session.form = Some(FeedbackForm::new(FormSurface::PageModal));
        let name = page_name(doc);
        self.ui.show_modal(doc, &name);
        if self.reviewer.is_none() {
            self.ui.show_name_prompt(doc, self.ui.modal_prompt_area)?;
        }
        Ok(())
    }

    fn close_modal(&mut self, doc: &mut Document) {
        if matches!(
            self.session.form.as_ref().map(|form| form.surface),
            Some(FormSurface::PageModal)
        ) {
            self.session.form = None;
        }
        self.ui.hide_modal(doc);
    }

    fn close_popover(&mut self, doc: &mut Document) {
        if self.session.mode == CaptureMode::Capturing {
            self.session.set_mode(CaptureMode::Idle);
        }
        if matches!(
            self.session.form.as_ref().map(|form| form.surface),
            Some(FormSurface::ElementPopover)
        ) {
            self.session.form = None;
        }
        self.session.target = None;
        self.ui.hide_popover(doc);
    }

    fn commit(&mut self, doc: &mut Document, reviewer: &ReviewerIdentity) -> Result<Spike> {
        let form = self
            .session
            .form
            .take()
            .ok_or_else(|| anyhow!("no feedback form is open"))?;

        let locator = match form.surface {
            FormSurface::PageModal => None,
            FormSurface::ElementPopover => match self.session.target.as_ref() {
                Some(target) => Some(target.locator.clone()),
                None => bail!("element feedback form has no captured target"),
            },
        };

        let spike = self.build_spike(doc, &form, locator, reviewer);

        match form.surface {
            FormSurface::PageModal => self.close_modal(doc),
            FormSurface::ElementPopover => self.close_popover(doc),
        }

        log_info!(
            "Captured {} spike {} for project {}",
            spike.kind.as_str(),
            spike.id,
            spike.project_key
        );
        Ok(spike)
    }

    fn build_spike(
        &self,
        doc: &Document,
        form: &FeedbackForm,
        locator: Option<ElementLocator>,
        reviewer: &ReviewerIdentity,
    ) -> Spike {
        let viewport = doc.viewport();
        Spike {
            id: new_id(),
            kind: if locator.is_some() {
                SpikeKind::Element
            } else {
                SpikeKind::Page
            },
            project_key: self.config.project.clone(),
            page_title: page_name(doc),
            page_url: doc.href().to_string(),
            locator,
            rating: form.rating,
            comment: form.comment.trim().to_string(),
            reviewer: reviewer.as_reviewer(),
            captured_at: Utc::now(),
            viewport: Viewport {
                width: viewport.width,
                height: viewport.height,
            },
            share_id: self.config.share_id.clone(),
        }
    }
}

/// Highlight `target`, replacing any previous highlight. Hovering the
/// element that is already highlighted changes nothing.
fn on_hover(session: &mut CaptureSession, doc: &mut Document, target: NodeId) {
    if is_excluded_element(doc, target) || session.highlighted() == Some(target) {
        return;
    }
    session.clear_highlight(doc);
    session.highlight = Some(HighlightGuard::apply(doc, target));
}

/// Title of the page, or its path when the title is empty.
pub fn page_name(doc: &Document) -> String {
    if doc.title().is_empty() {
        doc.pathname().to_string()
    } else {
        doc.title().to_string()
    }
}
