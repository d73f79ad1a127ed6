//! Waitlist form wiring for published pages.

const CLOSING_BODY: &str = "</body>";

/// Returns the `<script>` block that submits a page's email form to the
/// waitlist endpoint.
///
/// The script targets `form[data-waitlist]` and every form with an email
/// input, POSTs `{projectId, email}` as JSON to `/api/waitlist`, and shows a
/// toast on success or failure.
#[must_use]
pub fn waitlist_script(project_id: &str) -> String {
    // JSON string literal doubles as a safely quoted JS string.
    let project_literal =
        serde_json::to_string(project_id).unwrap_or_else(|_| String::from("\"\""));

    format!(
        r#"
<script>
(function () {{
  var projectId = {project_literal};
  function toast(message, color) {{
    var el = document.createElement('div');
    el.className = 'fixed top-4 right-4 ' + color + ' text-white px-4 py-2 rounded-md shadow-lg z-50';
    el.textContent = message;
    document.body.appendChild(el);
    setTimeout(function () {{ if (document.body.contains(el)) {{ document.body.removeChild(el); }} }}, 3000);
  }}
  function setLabel(button, text) {{
    if (!button) {{ return; }}
    if (button.tagName === 'INPUT') {{ button.value = text; }} else {{ button.textContent = text; }}
  }}
  var forms = document.querySelectorAll('form[data-waitlist], form:has(input[type="email"])');
  forms.forEach(function (form) {{
    form.addEventListener('submit', async function (e) {{
      e.preventDefault();
      var input = form.querySelector('input[type="email"]');
      if (!input) {{ return; }}
      var email = input.value.trim();
      if (!email) {{ return; }}
      var button = form.querySelector('button[type="submit"], input[type="submit"]');
      var original = button ? (button.tagName === 'INPUT' ? button.value : button.textContent) : '';
      if (button) {{ button.disabled = true; }}
      setLabel(button, 'Joining...');
      try {{
        var response = await fetch('/api/waitlist', {{
          method: 'POST',
          headers: {{ 'Content-Type': 'application/json' }},
          body: JSON.stringify({{ projectId: projectId, email: email }})
        }});
        if (!response.ok) {{ throw new Error('Failed to join waitlist'); }}
        input.value = '';
        setLabel(button, 'Joined!');
        toast('Successfully joined the waitlist!', 'bg-green-500');
        setTimeout(function () {{
          if (button) {{ button.disabled = false; }}
          setLabel(button, original);
        }}, 2000);
      }} catch (err) {{
        if (button) {{ button.disabled = false; }}
        setLabel(button, original);
        toast('Failed to join waitlist. Please try again.', 'bg-red-500');
      }}
    }});
  }});
}})();
</script>
"#
    )
}

/// Inserts the waitlist script before the last `</body>` tag.
///
/// The tag is matched case-insensitively. When the page has no `</body>`,
/// the script is appended at the end.
#[must_use]
pub fn inject_waitlist_script(html: &str, project_id: &str) -> String {
    let script = waitlist_script(project_id);

    // ASCII lowercasing keeps byte offsets aligned with `html`.
    match html.to_ascii_lowercase().rfind(CLOSING_BODY) {
        Some(idx) => {
            let mut out = String::with_capacity(html.len() + script.len());
            out.push_str(&html[..idx]);
            out.push_str(&script);
            out.push_str(&html[idx..]);
            out
        }
        None => format!("{html}{script}"),
    }
}
