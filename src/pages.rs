use instrument::{CLICK_ATTR, FORM_ATTR};
use page_model::{NodeId, Page};
use uxlab_core_types::Variant;

/// Variant-specific class vocabulary used when rendering the page templates.
/// Variant detection later recovers the framework from exactly these markers.
struct Skin {
    wrapper_class: &'static str,
    button_class: &'static str,
}

fn skin(variant: Variant) -> Skin {
    match variant {
        Variant::Bulma => Skin {
            wrapper_class: "section",
            button_class: "button is-primary",
        },
        Variant::Bootstrap => Skin {
            wrapper_class: "container",
            button_class: "btn btn-primary",
        },
        // No framework markers at all; detection reports unknown.
        Variant::Unknown => Skin {
            wrapper_class: "wrapper",
            button_class: "plain-button",
        },
    }
}

fn page_chrome(page: &Page, variant: Variant, title: &str) -> NodeId {
    let wrapper = page.append_element(page.body(), "div");
    page.set_attr(wrapper, "class", skin(variant).wrapper_class);
    let heading = page.append_element(wrapper, "h1");
    page.set_text(heading, title);
    wrapper
}

pub struct LoginPage {
    pub form: NodeId,
    pub nickname: NodeId,
    pub continue_btn: NodeId,
}

/// Login page: optional nickname, a continue button, the `login` task form.
/// Forms are assembled detached and inserted complete, the way templating
/// glue renders fragments; observers see them with their attributes set.
pub fn login_page(page: &Page, variant: Variant) -> LoginPage {
    let wrapper = page_chrome(page, variant, "Study sign-in");
    let form = page.create_element("form");
    page.set_attr(form, "id", "loginForm");
    page.set_attr(form, FORM_ATTR, "login");

    let nickname = page.append_element(form, "input");
    page.set_attr(nickname, "id", "nicknameInput");
    page.set_attr(nickname, "name", "nickname");

    let continue_btn = page.append_element(form, "button");
    page.set_attr(continue_btn, "id", "loginBtn");
    page.set_attr(continue_btn, "class", skin(variant).button_class);
    page.set_text(continue_btn, "Continue");

    page.append_child(wrapper, form);
    LoginPage {
        form,
        nickname,
        continue_btn,
    }
}

pub struct SubmitPage {
    pub form: NodeId,
    pub assignment: NodeId,
    pub file_input: NodeId,
    pub comments: NodeId,
    pub submit_btn: NodeId,
}

/// Submission page: assignment picker, simulated file input, required notes.
pub fn submit_page(page: &Page, variant: Variant) -> SubmitPage {
    let wrapper = page_chrome(page, variant, "Submit assignment");
    let form = page.create_element("form");
    page.set_attr(form, "id", "submitForm");
    page.set_attr(form, FORM_ATTR, "submit-assignment");

    let assignment = page.append_element(form, "select");
    page.set_attr(assignment, "name", "assignment");
    page.set_value(assignment, "hw1");

    let file_input = page.append_element(form, "input");
    page.set_attr(file_input, "name", "file");

    let comments = page.append_element(form, "textarea");
    page.set_attr(comments, "id", "commentsInput");
    page.set_attr(comments, "name", "comments");
    page.set_attr(comments, "required", "");

    let submit_btn = page.append_element(form, "button");
    page.set_attr(submit_btn, "id", "submitBtn");
    page.set_attr(submit_btn, "class", skin(variant).button_class);
    page.set_text(submit_btn, "Submit");

    page.append_child(wrapper, form);
    SubmitPage {
        form,
        assignment,
        file_input,
        comments,
        submit_btn,
    }
}

pub struct FeedbackPage {
    pub export_btn: NodeId,
    pub theme_btn: NodeId,
}

/// Feedback page: grading table placeholder plus explicitly tracked buttons.
pub fn feedback_page(page: &Page, variant: Variant) -> FeedbackPage {
    let wrapper = page_chrome(page, variant, "Your feedback");
    let table = page.append_element(wrapper, "table");
    page.set_attr(table, "id", "fb");

    let export_btn = page.append_element(wrapper, "button");
    page.set_attr(export_btn, "id", "exportBtn");
    page.set_attr(export_btn, "class", skin(variant).button_class);
    page.set_attr(export_btn, CLICK_ATTR, "export-csv");
    page.set_text(export_btn, "Download CSV");

    let theme_btn = page.append_element(wrapper, "button");
    page.set_attr(theme_btn, "id", "themeBtn");
    page.set_attr(theme_btn, "class", skin(variant).button_class);
    page.set_attr(theme_btn, CLICK_ATTR, "toggle-theme");
    page.set_text(theme_btn, "Toggle theme");

    FeedbackPage {
        export_btn,
        theme_btn,
    }
}
