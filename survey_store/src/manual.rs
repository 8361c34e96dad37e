/*!

This is the long-form manual for `survey_store` and `surveyctl`.

## The survey file

All the state of a survey lives in a single JSON document (by default
`survey-store.json`). It is rewritten in full after every change:

```json
{
  "participants": [
    {
      "id": "3f1c…",
      "email": "Ana@X.com",
      "firstName": "Ana",
      "lastName": "Lee",
      "createdAt": "2024-03-01T10:00:00Z",
      "hasVoted": true
    }
  ],
  "questions": [
    {
      "id": "9a2e…",
      "title": "Favorite genre?",
      "options": [
        { "id": "11…", "text": "RPG", "votes": 1 },
        { "id": "12…", "text": "FPS", "votes": 0 },
        { "id": "13…", "text": "No sé", "votes": 0 },
        { "id": "14…", "text": "Ninguno", "votes": 0 }
      ],
      "createdAt": "2024-03-01T10:05:00Z"
    }
  ],
  "votes": [
    {
      "id": "77…",
      "participantEmail": "ana@x.com",
      "questionId": "9a2e…",
      "optionId": "11…",
      "votedAt": "2024-03-02T18:30:00Z"
    }
  ]
}
```

Files written by older versions wrap the same content as
`{"state": {...}, "version": 0}`. They are read transparently and written
back in the plain form.

## Rules

* Emails are compared without regard to case. The casing used at
  registration is kept for display; votes store the lowercase form.
* Every question ends with the options `No sé` and `Ninguno`. They cannot be
  removed, and new options are always inserted just before them.
* A participant votes once. The first vote, on any question, closes the
  participant's ballot. `surveyctl vote` records the answers to all the
  questions in one step: either all of them are recorded, or none.
* Removing a question removes the votes cast on it. Removing an option
  removes the votes cast for it. Removing a participant keeps their votes.

## Configuration

`surveyctl --config survey.json` reads the following options:

| key          | default                 |                                        |
|--------------|-------------------------|----------------------------------------|
| `storePath`  | `survey-store.json`     | Where the survey is stored             |
| `baseUrl`    | `http://localhost:8080` | Prefix of the voting links             |
| `surveyName` | `Survey`                | Name reported with the results         |

The `--store` and `--base-url` flags take precedence over the file.

## Importing participants

`surveyctl import --input roster.xlsx` registers the participants listed in
the first worksheet (or the one given with `--worksheet`). The first row is a
header. The columns are, in order: email, first name, last name. Rows whose
email is already registered are reported and skipped.

## Results

`surveyctl results` prints the participation statistics and, for each
question, the options sorted by number of votes with their percentage. The
winner of a question is its most voted option, if it has any vote.
With `--reference expected.json`, the output is compared to a previously
saved summary and the differences are printed.

*/
