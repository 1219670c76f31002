//! Documents the syntax of both front ends and the composition calls.
//!
//! <details><summary><strong style="cursor: pointer">Table of Contents</strong></summary>
//!
//! - [bham](#bham)
//!   - [Indentation](#indentation)
//!   - [Tags](#tags)
//!   - [Text and Interpolations](#text-and-interpolations)
//!   - [Statements](#statements)
//!   - [Filters and Doctypes](#filters-and-doctypes)
//! - [Plain Templates](#plain-templates)
//! - [Pipelines](#pipelines)
//! - [Composition](#composition)
//!   - [Layouts](#layouts)
//!   - [Blocks](#blocks)
//!   - [Extending Templates](#extending-templates)
//! - [HTML Contexts](#html-contexts)
//!
//! </details>
//!
//! # bham
//!
//! A bham source describes HTML through indentation.
//!
//! ## Indentation
//!
//! Every line is indented with tabs, or (unless strict indentation is
//! enabled) with two spaces per level.  A line may be at most one level
//! deeper than the line before it.  Blank lines are ignored.  A line ending
//! in a backslash continues on the next physical line:
//!
//! ```text
//! %p(class="a" \
//!    id="b") text
//! ```
//!
//! ## Tags
//!
//! A tag line starts with `%name`, `.class` or `#id`.  The name defaults to
//! `div`, any number of classes and ids can follow, and an attribute list
//! in parentheses may close the tag part:
//!
//! ```text
//! %html
//!   %head
//!     %title= .Title
//!   %body
//!     #content.wide(data-role="main")
//!       %p Hello {{ .Name }}
//! ```
//!
//! Attribute values must be double quoted.  Shorthand classes are put in
//! front of an explicit `class` attribute and shorthand ids in front of an
//! explicit `id` attribute, joined by `_` (see
//! [`Settings::set_id_join`](crate::Settings::set_id_join)).
//!
//! A tag with nested lines becomes an opening and a closing tag around the
//! nested content.  Content after the tag part is put inside the element;
//! if it starts with `=` it is a pipeline whose value is written.
//!
//! A tag without content is written as an opening tag directly followed by
//! its closing tag.  A tag with content is written as the opening tag, the
//! content and the closing tag, each followed by a single space.
//!
//! ## Text and Interpolations
//!
//! Lines that are not tags or statements are text.  Text may embed
//! `{{ pipeline }}` interpolations.  An interpolation that does not parse
//! is kept as literal text and a warning is logged, unless strict
//! interpolation is enabled (then the compile fails).
//!
//! ## Statements
//!
//! Lines starting with `=` or `-` are statements.  Besides plain pipelines
//! (whose value is written) these keywords open a nested body:
//!
//! | statement | meaning |
//! |---|---|
//! | `= if pipeline` | body if the value is true |
//! | `= unless pipeline` | body if the value is false |
//! | `= range pipeline` | body once per element |
//! | `= with pipeline` | body with `.` set to the value if it is true |
//! | `= else` | alternative body of `if`, `unless` and `range` |
//! | `= else if pipeline` | chained condition |
//!
//! ```text
//! = range $i, $item := .Items
//!   %li= $item.Name
//! = else
//!   %p No items
//! ```
//!
//! ## Filters and Doctypes
//!
//! A `:trigger` line passes the lines nested below it verbatim to a
//! [`FilterHandler`](crate::FilterHandler).  `:javascript` and `:css` are
//! built in.  `!!!` writes a doctype, `!!! Strict` picks a registered one.
//!
//! # Plain Templates
//!
//! Plain templates are literal text with actions:
//!
//! ```text
//! {{ define "item" }}<li>{{ .Name }}</li>{{ end }}
//! <ul>{{ range .Items }}{{ template "item" . }}{{ else }}<li>none</li>{{ end }}</ul>
//! ```
//!
//! Available are `if`/`else if`/`else`/`end`, `range`, `with`, `define`,
//! `template`, comments (`{{/* … */}}`) and whitespace trimming with
//! `{{- ` and ` -}}`.
//!
//! # Pipelines
//!
//! A pipeline is a chain of commands separated by `|`.  The value of a
//! command is passed as the last argument to the next one.  Operands are
//! `.` (the current data), field chains (`.User.Name`), variables (`$x`,
//! `$` is the data the template was executed with), literals, function
//! names and parenthesized pipelines.  A pipeline may start by declaring
//! (`$x := …`) or assigning (`$x = …`) a variable.
//!
//! Values are false if they are `false`, zero, nil or empty.  Fields of
//! missing values are empty, fields of scalars are an error.
//!
//! # Composition
//!
//! The composition calls are available in every pipeline:
//!
//! | call | result |
//! |---|---|
//! | `yield` | the output of the main template |
//! | `yield "slot"` | the slot: a mapped template, a rendered block or nothing |
//! | `yield "slot" data` | like above, the mapped template renders with `data` |
//! | `yield "slot" (fallback "name")` | renders `name` if nothing fills the slot |
//! | `content_for "slot" "name"` | maps the slot to a template |
//! | `block "slot"` … `end_block` | a named block with a default body |
//! | `define_block "slot"` … `end_block` | captures a block without writing it |
//! | `extends "name"` | renders `name` instead, with this template's blocks |
//! | `exec "name" [data]` | the output of another template |
//! | `root_dot` | the data the render call was started with |
//!
//! ## Layouts
//!
//! With a layout set on the [`RenderContext`](crate::RenderContext) the
//! main template renders first, then the layout renders and pulls the main
//! output in with `yield`:
//!
//! ```text
//! %html
//!   %head
//!     %title= yield "title" (fallback "default_title")
//!   %body= yield
//! ```
//!
//! ## Blocks
//!
//! While the main template renders under a layout, `block "slot"` captures
//! its body into the slot instead of writing it.  The layout then yields
//! the slot.  A slot is only filled once: templates mapped with
//! `content_for` and blocks supplied by the application win over captured
//! blocks.
//!
//! Outside of a capturing template a block writes the content of its slot
//! if it has one and its default body otherwise.
//!
//! ## Extending Templates
//!
//! A template that calls `extends "base"` writes nothing itself.  Its
//! blocks are captured and `base` renders afterwards, writing the captured
//! blocks where it declares blocks of the same name.
//!
//! # HTML Contexts
//!
//! Every action knows whether it appears in markup, inside an inline
//! `<script>` or inside an inline `<style>`.  In auto escaping templates
//! values are escaped accordingly.  A rendered block can only be written
//! into the context it was rendered for (or anywhere if it was supplied as
//! [`BlockKind::User`](crate::BlockKind::User)), otherwise the render fails
//! with [`MismatchedBlockContext`](crate::ErrorKind::MismatchedBlockContext).
