//! Fixed prompt text.
//!
//! Character-authored prompts live on the character record; everything
//! here is built in. Placeholders follow [`crate::template`] syntax.

/// Appended to the online system prompt when inner monologue is enabled and
/// the character has no custom block.
pub const DEFAULT_INNER_MONOLOGUE: &str = "Before every reply, write what {char} privately \
thinks but does not say inside <os></os>. Then put the actual text messages inside \
<reply></reply>. {user} never sees the thought.";

pub const ONLINE_CLOSING: &str = "[Reply format]\n\
You are texting {user} as {char}. Write like a real person on a phone: short sentences, \
casual tone, no narration, no action descriptions, no asterisks.\n\
Split your reply into one to four separate messages and put ||| between them.\n\
If you want to poke {user} for attention, write [NUDGE] on its own.";

pub const OFFLINE_CLOSING: &str = "[Reply format]\n\
Continue the scene between {char} and {user} as immersive prose of about {word_count} words. \
Write only {char}'s actions, speech and perceptions. Do not use lists, headings, markdown \
or the ||| separator, and do not speak for {user}.";

pub const THEATER_CLOSING: &str = "[Reply format]\n\
This is the scenario \"{title}\". Stay strictly in character as {char} inside it. \
Never mention being an AI and never step outside the scenario. Do not speak for {user}.";

pub const REAL_TIME_SECTION: &str = "[Current time]\n{now}";

pub const MEMORY_HEADER: &str = "[Memories]";
pub const CONTEXT_MEMORY_HEADER: &str = "[Context]";
pub const SCENARIO_HEADER: &str = "[Scenario]";

/// Added to the online prompt after the user left a connected scenario.
pub const RETURN_NOTICE_HEADER: &str = "[Recent change]";

/// Content of the hidden signal left in the main timeline on room exit.
pub const DEPARTURE_SIGNAL: &str = "{user} and {char} have left the scenario \"{title}\" \
and are back to texting on their phones.";

pub const SUMMARY_PROMPT: &str = "You keep {char}'s memory. Read the conversation below and \
summarize what happened in it. Answer with one JSON object and nothing else:\n\
{\"location\": \"where it happened\", \"event\": \"a short title\", \
\"status\": \"how things stand now\", \"summary\": \"what happened, in a few sentences\"}";

pub const FUSION_PROMPT: &str = "You keep {char}'s memory. The memory entries below are \
separated by ---. Merge them into one coherent memory without losing important facts. \
Answer with one JSON object and nothing else:\n\
{\"location\": \"...\", \"event\": \"a short title\", \"status\": \"...\", \
\"summary\": \"the merged memory\"}";

pub const DIARY_PROMPT: &str = "You are {char}. Write today's private diary entry about \
{user}, based on your recent conversation. Write in first person, honest and unguarded. \
Answer with one JSON object and nothing else:\n\
{\"title\": \"...\", \"content\": \"...\", \"mood\": \"one or two words\"}";
